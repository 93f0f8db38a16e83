use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 9] = [
        "RUST_LOG",
        "PAYIN_HOST",
        "PAYIN_PORT",
        "PAYIN_DATABASE_URL",
        "PAYIN_EXCHANGE_RATE_TTL",
        "PAYIN_BOOSTED_TEAMS_TTL",
        "PAYIN_ALLOCATION_TIMEOUT_MS",
        "PAYIN_MAX_ALLOCATION_ATTEMPTS",
        "PAYIN_RUN_MIGRATIONS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    });
    let redis = if env::var("PAYIN_REDIS_URL").is_ok() { "Set (hidden)" } else { "Not set" };
    println!("  {:<35} {redis:<15}", "PAYIN_REDIS_URL");
}
