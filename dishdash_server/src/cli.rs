use std::{env, env::VarError};

/// There's no real CLI for the server. Any argument at all prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
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
    // Secrets are deliberately absent from this list
    const DISPLAY_ENVS: [&str; 13] = [
        "RUST_LOG",
        "DD_HOST",
        "DD_PORT",
        "DD_DATABASE_URL",
        "DD_RUN_MIGRATIONS",
        "DD_JWT_EXPIRY_HOURS",
        "DD_AVAILABILITY_TIMEOUT",
        "DD_EXPIRY_SWEEP_SECONDS",
        "DD_ADMIN_FEE",
        "DD_GATEWAY_FEE_BPS",
        "DD_CURRENCY",
        "DD_RAZORPAY_KEY_ID",
        "DD_RAZORPAY_API_URL",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
