//! # Seed Data Generator
//!
//! Populates a store with demo vehicles for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./frota_dev.db with the demo fleet
//! cargo run -p frota-store --bin seed
//!
//! # Specify database path
//! cargo run -p frota-store --bin seed -- --db ./data/frota.db
//!
//! # Also open one active contract on the first vehicle
//! cargo run -p frota-store --bin seed -- --with-contract
//! ```

use chrono::Utc;
use std::env;
use tracing_subscriber::EnvFilter;

use frota_core::{Contract, FuelLevel, UserMeta, Vehicle};
use frota_store::{ContractRepository, Store, StoreConfig};

/// (plate, make, model, colour, year, fuel, km)
const FLEET: &[(&str, &str, &str, &str, i32, &str, u64)] = &[
    ("AA-11-BB", "Renault", "Clio", "Branco", 2021, "Gasolina", 42_300),
    ("CC-22-DD", "Peugeot", "208", "Cinzento", 2022, "Gasóleo", 18_950),
    ("EE-33-FF", "Volkswagen", "Polo", "Preto", 2020, "Gasolina", 61_200),
    ("GG-44-HH", "Seat", "Ibiza", "Vermelho", 2023, "Gasolina", 7_800),
    ("II-55-JJ", "Fiat", "500", "Azul", 2019, "Gasolina", 73_400),
    ("KK-66-LL", "Toyota", "Yaris", "Branco", 2022, "Híbrido", 25_100),
    ("MM-77-NN", "Tesla", "Model 3", "Preto", 2023, "Elétrico", 12_650),
    ("OO-88-PP", "Dacia", "Sandero", "Cinzento", 2021, "GPL", 38_700),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,frota=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./frota_dev.db");
    let mut with_contract = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--with-contract" => with_contract = true,
            "--help" | "-h" => {
                println!("Frota Rent Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file path (default: ./frota_dev.db)");
                println!("      --with-contract Open an active contract on the first vehicle");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Frota Rent Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!();

    let store = Store::sqlite(StoreConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = store.vehicles().list().await?;
    if !existing.is_empty() {
        println!("⚠ Store already has {} vehicles", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Inserting vehicles...");

    let seeded_by = UserMeta {
        uid: None,
        email: None,
        nome: "seed".to_string(),
    };
    let now = Utc::now();
    let mut first: Option<Vehicle> = None;

    for (plate, make, model, colour, year, fuel, km) in FLEET {
        let vehicle = Vehicle {
            matricula: plate.to_string(),
            marca: Some(make.to_string()),
            modelo: Some(model.to_string()),
            cor: Some(colour.to_string()),
            ano: Some(*year),
            combustivel: Some(fuel.to_string()),
            quilometragem: Some(*km),
            nivel_combustivel: Some(FuelLevel::from_percent(100)),
            estado: Some("Bom estado".to_string()),
            disponivel: Some(true),
            atualizado_por: Some(seeded_by.clone()),
            atualizado_em: Some(now),
            ..Default::default()
        };

        match store.vehicles().insert(&vehicle).await {
            Ok(id) => {
                println!("  {} {} {} → {}", plate, make, model, id);
                if first.is_none() {
                    first = Some(vehicle.with_id(id));
                }
            }
            Err(e) => eprintln!("Failed to insert {}: {}", plate, e),
        }
    }

    if with_contract {
        if let Some(vehicle) = first {
            let mut contract = Contract {
                id: ContractRepository::new_id(),
                veiculo_id: vehicle.id.clone(),
                veiculo: vehicle,
                criado_por: Some(seeded_by.clone()),
                criado_em: Some(now),
                ..Default::default()
            };
            contract.cliente.nome = "Cliente Demonstração".to_string();
            contract.aluguer.inicio = now.format("%Y-%m-%d").to_string();
            contract.aluguer.fim = (now + chrono::Duration::days(3)).format("%Y-%m-%d").to_string();
            contract.aluguer.preco_diario = Some(35.0);
            let (contract, quote) = contract.with_derived_pricing();

            store.contracts().put_active(&contract).await?;
            println!();
            println!(
                "✓ Active contract {} ({} days, {})",
                contract.id, quote.days, quote.total
            );
        }
    }

    println!();
    println!("✓ Seed complete! {} vehicles", store.vehicles().list().await?.len());

    Ok(())
}
