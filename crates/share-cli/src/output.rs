//! Table and JSON rendering for CLI results

use chrono::DateTime;
use clap::ValueEnum;
use medshare_core::{AccessLogEntry, HistoryEntry, SharedRecord, TxReceipt};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn timestamp(unix: i64) -> String {
    DateTime::from_timestamp(unix, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| unix.to_string())
}

pub fn print_shared_records(records: &[SharedRecord], format: Format) -> anyhow::Result<()> {
    if format == Format::Json {
        return print_json(records);
    }
    if records.is_empty() {
        println!("No records shared with you.");
        return Ok(());
    }
    println!(
        "{:<16} {:<20} {:<5} {:<6} {:<44} {:<24} {}",
        "RECORD", "PATIENT", "AGE", "BLOOD", "OWNER", "EXPIRES", "REMAINING"
    );
    for record in records {
        println!(
            "{:<16} {:<20} {:<5} {:<6} {:<44} {:<24} {}",
            record.id,
            truncate(&record.metadata.patient_name, 20),
            record.metadata.age,
            record.metadata.blood_group,
            record.owner,
            timestamp(record.expiry_time),
            record.remaining_time
        );
    }
    Ok(())
}

pub fn print_record_history(entries: &[AccessLogEntry], now: i64, format: Format) -> anyhow::Result<()> {
    if format == Format::Json {
        return print_json(entries);
    }
    if entries.is_empty() {
        println!("No access has been granted for this record.");
        return Ok(());
    }
    println!("{:<44} {:<24} {:<24} {}", "GRANTEE", "GRANTED", "EXPIRES", "STATUS");
    for entry in entries {
        println!(
            "{:<44} {:<24} {:<24} {}",
            entry.grantee,
            timestamp(entry.granted_at),
            timestamp(entry.expires_at),
            entry.status(now)
        );
    }
    Ok(())
}

pub fn print_global_history(entries: &[HistoryEntry], now: i64, format: Format) -> anyhow::Result<()> {
    if format == Format::Json {
        return print_json(entries);
    }
    if entries.is_empty() {
        println!("No access has been granted on any of your records.");
        return Ok(());
    }
    println!(
        "{:<16} {:<44} {:<24} {:<24} {}",
        "RECORD", "GRANTEE", "GRANTED", "EXPIRES", "STATUS"
    );
    for HistoryEntry { record_id, entry } in entries {
        println!(
            "{:<16} {:<44} {:<24} {:<24} {}",
            record_id,
            entry.grantee,
            timestamp(entry.granted_at),
            timestamp(entry.expires_at),
            entry.status(now)
        );
    }
    Ok(())
}

pub fn print_receipt(action: &str, receipt: &TxReceipt, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Json => print_json(&serde_json::json!({
            "action": action,
            "tx_hash": receipt.tx_hash,
            "block_number": receipt.block_number,
        })),
        Format::Table => {
            println!("{} confirmed in block {} (tx {})", action, receipt.block_number, receipt.tx_hash);
            Ok(())
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
