use std::fmt::Write as _;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::valuation::PortfolioSnapshot;

/// Round (half away from zero) to `decimals` places when given, then strip
/// trailing zeros.
pub fn format_value(value: Decimal, decimals: Option<u32>) -> String {
    let rounded = match decimals {
        Some(dp) => value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        None => value,
    };
    rounded.normalize().to_string()
}

/// Like [`format_value`], but padded to exactly `decimals` places and with
/// thousands separators. For human-facing output only.
pub fn format_value_display(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let s = rounded.abs().normalize().to_string();

    let (int_part, frac_part) = s.split_once('.').unwrap_or((s.as_str(), ""));

    let mut out = String::with_capacity(s.len() + s.len() / 3 + decimals as usize + 2);
    if negative {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if decimals > 0 {
        out.push('.');
        let frac: String = frac_part.chars().take(decimals as usize).collect();
        let _ = write!(out, "{frac:0<width$}", width = decimals as usize);
    }
    out
}

/// Plain-text table of a snapshot: one row per asset, then the total.
pub fn format_snapshot_table(snapshot: &PortfolioSnapshot, decimals: u32) -> String {
    let rows: Vec<[String; 4]> = snapshot
        .details
        .iter()
        .map(|v| {
            [
                v.coin.clone(),
                format_value(v.amount, None),
                format_value(v.price, None),
                format_value_display(v.value, decimals),
            ]
        })
        .collect();

    let header = ["COIN", "AMOUNT", "PRICE", "VALUE"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: [&str; 4]| {
        let _ = writeln!(
            out,
            "{:<w0$}  {:>w1$}  {:>w2$}  {:>w3$}",
            cells[0],
            cells[1],
            cells[2],
            cells[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
        );
    };

    push_row(header);
    for row in &rows {
        push_row([&row[0], &row[1], &row[2], &row[3]]);
    }
    let total = format_value_display(snapshot.total_value, decimals);
    push_row(["TOTAL", "", "", &total]);
    out
}
