use crate::app::App;
use crate::prompt::{confirm, or_ask};
use crate::report::print_contact_row;
use anyhow::{bail, Context, Result};
use clap::Args;
use memorie_core::session::Route;
use memorie_core::types::{ContactUpdate, NewContact, DEFAULT_AVATAR_URL};
use memorie_core::validate::{validate_trusted_contact, TrustedContactForm};
use std::path::PathBuf;

#[derive(Args)]
pub struct AddArgs {
    #[arg(long)]
    name: Option<String>,
    /// Mother, Father, Brother, Sister, Wife, Husband, Son, Daughter, Girlfriend, Boyfriend or Friend
    #[arg(long)]
    relationship: Option<String>,
    /// Where you met
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    note: Option<String>,
    /// JPEG photo used to index the face
    #[arg(long)]
    picture: Option<PathBuf>,
}

#[derive(Args)]
pub struct EditArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    relationship: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    /// Phone number or other contact handle
    #[arg(long)]
    contact: Option<String>,
    #[arg(long)]
    avatar: Option<String>,
}

pub async fn list(app: &App, search: Option<&str>) -> Result<()> {
    app.require_signed_in()?;
    let mut repo = app.contacts();

    // First visit: nothing cached yet, so pull from the backend.
    if !app.store.has_contacts() && repo.contacts().is_empty() {
        tracing::info!("no cached contacts; fetching from backend");
        if let Err(e) = repo.refresh(&app.api).await {
            eprintln!("Could not load contacts: {e}");
        }
    }

    let contacts = match search {
        Some(term) => repo.search(term),
        None => repo.contacts().iter().collect(),
    };
    if contacts.is_empty() {
        println!("No contacts");
        return Ok(());
    }
    for contact in contacts {
        print_contact_row(contact);
    }
    Ok(())
}

pub async fn refresh(app: &App) -> Result<()> {
    app.require_signed_in()?;
    let mut repo = app.contacts();
    let count = repo.refresh(&app.api).await?;
    println!("Loaded {count} contacts");
    Ok(())
}

pub async fn add(app: &App, args: AddArgs) -> Result<()> {
    let user = app.require_signed_in()?;

    let form = TrustedContactForm {
        name: or_ask(args.name, "Name")?,
        relationship: or_ask(args.relationship, "Relationship")?,
        location: args.location,
        phone: args.phone,
        email: args.email,
        note: args.note,
    };
    let request = validate_trusted_contact(&form, &user.id)?;

    let picture = match &args.picture {
        Some(path) => Some(
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => None,
    };

    let created = app.api.create_trusted_contact(&request, picture).await?;
    tracing::info!(id = %created.id, indexed = created.face_indexed, "trusted contact created");

    let avatar = match created.picture {
        Some(_) => created.picture_url(),
        None => DEFAULT_AVATAR_URL.to_string(),
    };
    let mut repo = app.contacts();
    repo.add(NewContact {
        name: request.name.clone(),
        relationship: request.relationship.to_string(),
        avatar,
        location: Some(request.location.clone()),
        notes: request.note.clone(),
        contact: Some(request.phone.clone()),
    });

    println!("Saved {} ({})", request.name, request.relationship);
    Ok(())
}

pub fn edit(app: &App, args: EditArgs) -> Result<()> {
    app.enter(Route::EditContact(args.id.clone()))?;

    let update = ContactUpdate {
        name: args.name,
        relationship: args.relationship,
        avatar: args.avatar,
        location: args.location,
        notes: args.notes,
        contact: args.contact,
        ..Default::default()
    };
    if update.is_empty() {
        bail!("Nothing to change. Pass at least one field, e.g. --name.");
    }

    let mut repo = app.contacts();
    if !repo.update(&args.id, &update) {
        bail!("No contact with id {}", args.id);
    }
    println!("Updated {}", args.id);
    Ok(())
}

pub fn delete(app: &App, id: &str) -> Result<()> {
    app.require_signed_in()?;
    let mut repo = app.contacts();
    let Some(contact) = repo.get(id) else {
        bail!("No contact with id {id}");
    };
    if !confirm(&format!("Delete {}?", contact.name))? {
        return Ok(());
    }
    repo.delete(id);
    println!("Deleted {id}");
    Ok(())
}

pub fn show(app: &App, id: &str) -> Result<()> {
    app.require_signed_in()?;
    let repo = app.contacts();
    let contact = repo.get(id).with_context(|| format!("No contact with id {id}"))?;

    println!("{} ({})", contact.name, contact.relationship);
    println!("  id:           {}", contact.id);
    println!("  memory score: {}", contact.score());
    if let Some(v) = &contact.last_seen {
        println!("  last seen:    {v}");
    }
    if let Some(v) = &contact.location {
        println!("  location:     {v}");
    }
    if let Some(v) = &contact.contact {
        println!("  contact:      {v}");
    }
    if let Some(v) = &contact.notes {
        println!("  notes:        {v}");
    }
    println!("  avatar:       {}", contact.avatar);

    let sightings = app
        .store
        .get_recognition_logs()
        .iter()
        .filter(|log| log.contact_id == contact.id)
        .count();
    println!("  sightings:    {sightings}");
    Ok(())
}
