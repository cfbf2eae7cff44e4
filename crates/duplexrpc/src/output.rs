use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CallOutput<'a> {
    function: &'a str,
    mode: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
}

/// Print the outcome of a call; `result` is `None` for async calls.
pub fn print_result(function: &str, result: Option<&Value>, format: OutputFormat) {
    println!("{}", render_result(function, result, format));
}

fn render_result(function: &str, result: Option<&Value>, format: OutputFormat) -> String {
    let mode = if result.is_some() { "sync" } else { "async" };
    match format {
        OutputFormat::Json => {
            let out = CallOutput {
                function,
                mode,
                result,
            };
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FUNCTION", "MODE", "RESULT"])
                .add_row(vec![
                    function.to_string(),
                    mode.to_string(),
                    result.map(Value::to_string).unwrap_or_else(|| "-".to_string()),
                ]);
            table.to_string()
        }
        OutputFormat::Pretty => match result {
            Some(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
            None => format!("{function}: sent"),
        },
        OutputFormat::Raw => match result {
            Some(Value::String(text)) => text.clone(),
            Some(value) => value.to_string(),
            None => String::new(),
        },
    }
}
