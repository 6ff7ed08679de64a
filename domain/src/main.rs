use std::env;
use std::process;
use std::time::{Duration, SystemTime};

use domain::adapters::memory_repo::InMemoryOrderRepo;
use domain::service::OrderService;
use domain::{CoreError, NewOrder, Order, OrderId, OrderStatus};

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain list\n  domain get <id>\n\nNotes:\n  - This demo CLI uses an in-memory repository seeded with three orders; data is not persisted across runs.",
        domain::about()
    );
}

fn seed(repo: &InMemoryOrderRepo) -> Result<(), CoreError> {
    let now = SystemTime::now();
    let day = Duration::from_secs(24 * 60 * 60);
    for (age_days, status) in [
        (3, OrderStatus::Paid),
        (2, OrderStatus::WaitingPayment),
        (1, OrderStatus::Shipped),
    ] {
        repo.create(NewOrder {
            moment: now.checked_sub(day * age_days).unwrap_or(SystemTime::UNIX_EPOCH),
            status,
        })?;
    }
    Ok(())
}

fn describe(order: &Order) -> String {
    let secs = order
        .moment
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("#{} {} (placed at {}s)", order.id, order.status.as_str(), secs)
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    let repo = InMemoryOrderRepo::new();
    seed(&repo).map_err(|e| format!("seed failed: {}", e))?;
    let svc = OrderService::new(&repo);

    match cmd.as_str() {
        "list" => {
            let orders = svc.find_all().map_err(|e| format!("list failed: {}", e))?;
            for order in &orders {
                println!("{}", describe(order));
            }
            Ok(())
        }
        "get" => {
            let Some(raw) = args.next() else {
                return Err("missing <id> for get".into());
            };
            let id = OrderId::parse(&raw).map_err(|e| e.to_string())?;
            match svc.find_by_id(id) {
                Ok(order) => {
                    println!("{}", describe(&order));
                    Ok(())
                }
                Err(CoreError::NotFound) => Err("not found".into()),
                Err(e) => Err(format!("get failed: {}", e)),
            }
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
