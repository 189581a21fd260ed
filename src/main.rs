/// Folder inspection tool: known class names and a QC report for an annotation folder
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::path::PathBuf;

    use qcedit::native::{FolderClassNames, build_report};
    use qcedit::{AppConfig, ClassNameSource, QcMode};

    let config = AppConfig::load_from_default_path().unwrap_or_default();
    env_logger::Builder::new()
        .filter_level(config.preferences.log_filter())
        .parse_default_env()
        .init();

    let mut folder: Option<PathBuf> = None;
    let mut mode = config.preferences.qc_mode;
    let mut report = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--segmentation" => mode = QcMode::Segmentation,
            "--detection" => mode = QcMode::Detection,
            "--report" => report = true,
            "-h" | "--help" => {
                print_usage();
                return;
            }
            other => folder = Some(PathBuf::from(other)),
        }
    }
    let Some(folder) = folder else {
        print_usage();
        std::process::exit(2);
    };

    log::info!("Inspecting {:?} in {} mode", folder, mode.name());
    match FolderClassNames::new(&folder).class_names(mode) {
        Ok(names) => {
            println!("Class names ({}):", names.len());
            for name in names {
                println!("  {}", name);
            }
        }
        Err(e) => {
            eprintln!("Failed to read {:?}: {}", folder, e);
            std::process::exit(1);
        }
    }

    if report {
        let result = build_report(&folder, mode)
            .map_err(|e| e.to_string())
            .and_then(|r| serde_json::to_string_pretty(&r).map_err(|e| e.to_string()));
        match result {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Report failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn print_usage() {
    eprintln!("Usage: qcedit-native <folder> [--detection | --segmentation] [--report]");
}

// The library is driven by the host page on wasm
#[cfg(target_arch = "wasm32")]
fn main() {}
