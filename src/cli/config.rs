use comfy_table::{Cell, Table};

use merchant_insights::error::Result;
use merchant_insights::settings::{save_settings, settings_path, Settings};

#[derive(Debug, Default)]
pub struct Changes {
    pub output_dir: Option<String>,
    pub transactions_path: Option<String>,
    pub merchants_path: Option<String>,
    pub display_rows: Option<usize>,
    pub log_level: Option<String>,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.output_dir.is_none()
            && self.transactions_path.is_none()
            && self.merchants_path.is_none()
            && self.display_rows.is_none()
            && self.log_level.is_none()
    }

    fn apply(self, settings: &mut Settings) {
        if let Some(v) = self.output_dir {
            settings.output_dir = v;
        }
        if let Some(v) = self.transactions_path {
            settings.transactions_path = Some(v);
        }
        if let Some(v) = self.merchants_path {
            settings.merchants_path = Some(v);
        }
        if let Some(v) = self.display_rows {
            settings.display_rows = v;
        }
        if let Some(v) = self.log_level {
            settings.log_level = v;
        }
    }
}

pub fn run(mut settings: Settings, changes: Changes) -> Result<()> {
    if !changes.is_empty() {
        changes.apply(&mut settings);
        save_settings(&settings)?;
        println!("Saved settings to {}", settings_path().display());
    }
    println!("{}", format_settings(&settings));
    Ok(())
}

fn format_settings(settings: &Settings) -> String {
    let unset = || "-".to_string();
    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec![Cell::new("output_dir"), Cell::new(&settings.output_dir)]);
    table.add_row(vec![
        Cell::new("transactions_path"),
        Cell::new(settings.transactions_path.clone().unwrap_or_else(unset)),
    ]);
    table.add_row(vec![
        Cell::new("merchants_path"),
        Cell::new(settings.merchants_path.clone().unwrap_or_else(unset)),
    ]);
    table.add_row(vec![Cell::new("display_rows"), Cell::new(settings.display_rows)]);
    table.add_row(vec![Cell::new("log_level"), Cell::new(&settings.log_level)]);
    format!("Settings\n{table}")
}
