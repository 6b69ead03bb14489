//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the configured database and run one todo lifecycle through the
//!   typed client: create, complete, delete, restore.
//! - Print one deterministic line per step.
//!
//! Usage: `notch_cli [handle] [password]`. Configuration comes from the
//! `NOTCH_*` environment variables; `NOTCH_LOG_DIR` enables file logging.

use notch_client::{ErrorKind, LocalTransport, NotchClient};
use notch_core::model::todo::{NewTodo, TodoPatch};
use notch_core::model::user::NewUser;
use notch_core::{core_version, default_log_level, init_logging, CoreConfig, Router};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("notch_cli failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var("NOTCH_LOG_DIR") {
        init_logging(default_log_level(), &log_dir)?;
    }

    let mut args = std::env::args().skip(1);
    let handle = args.next().unwrap_or_else(|| "smoke".to_string());
    let password = args.next().unwrap_or_else(|| "smoke-pass".to_string());

    let config = CoreConfig::from_env()?;
    println!("notch_core version={}", core_version());
    println!("db_path={}", config.db_path.display());

    let client = NotchClient::new(LocalTransport::new(Router::open(config)?));
    let health = client.health()?;
    println!("health ok={} service={}", health.ok, health.service);

    match client.bootstrap(&NewUser::new(handle.as_str(), password.as_str())) {
        Ok(()) => println!("bootstrap created={handle}"),
        Err(err) if err.kind == ErrorKind::Conflict => println!("bootstrap skipped"),
        Err(err) => return Err(err.into()),
    }

    let user = client.login(&handle, &password)?;
    println!("login handle={}", user.handle);

    let todo = client.create_todo(&NewTodo::new("notch smoke check"))?;
    println!("create version={} done={}", todo.meta.version, todo.done);

    let todo = client.patch_todo(
        &todo.meta.id,
        &TodoPatch::new().expect_version(todo.meta.version).done(true),
    )?;
    println!("patch version={} done={}", todo.meta.version, todo.done);

    let first = client.delete_todo(&todo.meta.id)?;
    let second = client.delete_todo(&todo.meta.id)?;
    println!("delete first={} second={}", first.deleted, second.deleted);

    let restored = client.restore_todo(&todo.meta.id)?;
    println!(
        "restore version={} deleted_at={:?}",
        restored.meta.version, restored.deleted_at
    );

    client.logout()?;
    println!("logout ok");
    Ok(())
}
