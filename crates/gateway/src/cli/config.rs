use sb_domain::config::{Config, ConfigSeverity};

/// Check the loaded config and print every issue found.
///
/// Warnings are tolerated; the command only fails on errors.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();
    if issues.is_empty() {
        println!("{config_path}: OK");
        return true;
    }

    let mut errors = 0usize;
    for issue in &issues {
        println!("{issue}");
        if issue.severity == ConfigSeverity::Error {
            errors += 1;
        }
    }
    println!(
        "\n{config_path}: {errors} error(s), {} warning(s)",
        issues.len() - errors
    );

    errors == 0
}

/// Print the effective config (defaults applied) as TOML.
pub fn show(config: &Config) {
    match toml::to_string_pretty(config) {
        Ok(rendered) => print!("{rendered}"),
        Err(e) => {
            eprintln!("cannot serialize config: {e}");
            std::process::exit(1);
        }
    }
}
