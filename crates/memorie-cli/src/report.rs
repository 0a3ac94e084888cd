//! Read-only views: today's sightings, insights and status.

use crate::app::App;
use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use memorie_core::contacts::RECENT_LIMIT;
use memorie_core::insights::{
    contacts_with_logs, memory_percent, per_contact, recently_seen, todays_logs,
};
use memorie_core::types::{Contact, RecognitionLog};
use memorie_hw::Camera;

pub fn contact_row(contact: &Contact) -> String {
    let mut row = format!(
        "{:<14} {:<24} {:<10} score {:>3}",
        contact.id,
        contact.name,
        contact.relationship,
        contact.score()
    );
    if let Some(seen) = &contact.last_seen {
        row.push_str(&format!("  seen {seen}"));
    }
    row
}

pub fn print_contact_row(contact: &Contact) {
    println!("{}", contact_row(contact));
}

/// Local wall-clock time of an RFC 3339 timestamp, or the raw string if it does not parse.
fn local_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Local).format("%-I:%M %p").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

pub fn log_line(log: &RecognitionLog) -> String {
    let mut line = format!("{:>8}  {} ({})", local_time(&log.timestamp), log.name, log.relationship);
    if let Some(location) = log.location.as_deref().filter(|l| !l.is_empty()) {
        line.push_str(&format!(" at {location}"));
    }
    line
}

pub fn today(app: &App) -> Result<()> {
    let user = app.require_signed_in()?;
    let logs = app.store.get_recognition_logs();
    let today = todays_logs(&logs, Utc::now().date_naive());

    println!("Hello, {}", user.name);
    if today.is_empty() {
        println!("No one recognized today");
    } else {
        println!("Recognized today ({}):", today.len());
        for log in today {
            println!("  {}", log_line(log));
        }
    }

    let recent = recently_seen(&logs, RECENT_LIMIT);
    if !recent.is_empty() {
        println!("Recently seen:");
        for log in recent {
            println!("  {}", log_line(log));
        }
    }
    Ok(())
}

pub fn insights(app: &App) -> Result<()> {
    app.require_signed_in()?;
    let contacts = app.store.get_contacts();
    let logs = app.store.get_recognition_logs();

    let rows = per_contact(&contacts, &logs);
    if rows.is_empty() {
        println!("No sightings yet. Run `memorie recognize` to start.");
        return Ok(());
    }

    println!("Memory: {}%", memory_percent(&contacts, &logs));
    println!(
        "Remembered contacts: {} of {}",
        contacts_with_logs(&contacts, &logs).len(),
        rows.len()
    );
    for row in rows {
        println!(
            "  {:<24} {:<10} score {:>3}  seen {:>3}",
            row.contact.name, row.contact.relationship, row.score, row.seen
        );
    }
    Ok(())
}

pub fn status(app: &App) {
    let config = &app.config;
    println!("data dir:   {}", config.data_dir.display());
    let config_file = config.config_file();
    if config_file.exists() {
        println!("config:     {}", config_file.display());
    } else {
        println!("config:     {} (not present)", config_file.display());
    }
    println!("store:      {}", config.db_path.display());
    println!("backend:    {}", app.api.base_url());
    println!("camera:     {}", config.camera_device);

    match app.session.current() {
        Some(user) => println!("signed in:  {} <{}>", user.name, user.email),
        None => println!("signed in:  no"),
    }
    println!("contacts:   {}", app.store.get_contacts().len());
    println!("sightings:  {}", app.store.get_recognition_logs().len());

    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("devices:    none found");
    }
    for device in devices {
        println!("device:     {} {} ({}, {})", device.path, device.card, device.driver, device.bus);
    }
}
