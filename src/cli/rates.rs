use super::ui;
use crate::core::{CurrencyRate, Metric, RateAggregator};
use anyhow::Result;
use comfy_table::Cell;
use futures::future;
use tracing::debug;

pub const NO_DATA: &str = "No data found";

/// Fetches the rates for `base_currency` and prints the report.
///
/// Ctrl-C during the auxiliary fetches stops waiting for them; whatever
/// arrived so far is still printed.
pub async fn run(aggregator: &RateAggregator, base_currency: &str) -> Result<()> {
    let pb = ui::new_progress_bar(0, true);
    pb.set_message(format!("Fetching rates for {base_currency}"));

    let on_settled = |total: usize| {
        pb.set_length(total as u64);
        pb.inc(1);
    };
    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            future::pending::<()>().await;
        }
        debug!("Interrupted, rendering partial results");
    };

    let records = aggregator
        .aggregate_with(base_currency, &on_settled, cancel)
        .await;
    pb.finish_and_clear();

    println!(
        "{}",
        render(&records, base_currency, aggregator.secondary_currency())
    );
    Ok(())
}

/// Formats the records as a table in input order, or a notice when empty.
pub fn render(records: &[CurrencyRate], base_currency: &str, secondary_currency: &str) -> String {
    if records.is_empty() {
        return ui::style_text(NO_DATA, ui::StyleType::Error);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Rate to {base_currency}")),
        ui::header_cell(&format!("Rate to {secondary_currency}")),
        ui::header_cell(&format!("Change to {base_currency}")),
        ui::header_cell(&format!("Change to {secondary_currency}")),
    ]);

    for record in records {
        table.add_row(vec![
            Cell::new(display_code(&record.code)),
            ui::rate_cell(record.rate_to_base),
            metric_cell(record, Metric::RateToSecondary),
            metric_cell(record, Metric::ChangeVsBase),
            metric_cell(record, Metric::ChangeVsSecondary),
        ]);
    }

    let mut output = format!(
        "{}\n\n{}",
        ui::style_text("Currencies and Exchange Rates", ui::StyleType::Title),
        table
    );

    if records.iter().any(|r| !r.failed.is_empty()) {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                "N/A: value could not be fetched, run with --verbose for details",
                ui::StyleType::Subtle
            )
        ));
    }

    output
}

fn metric_cell(record: &CurrencyRate, metric: Metric) -> Cell {
    if record.has_failed(metric) {
        return ui::na_cell(true);
    }
    match metric {
        Metric::RateToSecondary => ui::rate_cell(record.get(metric)),
        Metric::ChangeVsBase | Metric::ChangeVsSecondary => ui::change_cell(record.get(metric)),
    }
}

/// Last three characters of the code; shorter codes are shown as they are.
fn display_code(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    match chars.len() {
        0 => "N/A".to_string(),
        n if n > 3 => chars[n - 3..].iter().collect(),
        _ => code.to_string(),
    }
}
