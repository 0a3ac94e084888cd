use crate::app::App;
use crate::prompt::or_ask;
use anyhow::Result;
use chrono::Local;
use clap::Args;
use memorie_core::session::Route;
use memorie_core::validate::SignupForm;

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long)]
    confirm_password: Option<String>,
    /// male or female
    #[arg(long)]
    gender: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    date_of_birth: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

pub async fn register(app: &App, args: RegisterArgs) -> Result<()> {
    if !app.enter(Route::Signup)? {
        return Ok(());
    }

    let form = SignupForm {
        name: or_ask(args.name, "Name")?,
        email: or_ask(args.email, "Email")?,
        password: or_ask(args.password, "Password")?,
        confirm_password: or_ask(args.confirm_password, "Confirm password")?,
        gender: or_ask(args.gender, "Gender (male/female)")?,
        date_of_birth: or_ask(args.date_of_birth, "Date of birth (YYYY-MM-DD)")?,
        phone: or_ask(args.phone, "Phone")?,
    };

    let route = app
        .session
        .signup(&app.api, &form, Local::now().date_naive())
        .await?;
    greet(app, route);
    Ok(())
}

pub async fn login(app: &App, email: Option<String>, password: Option<String>) -> Result<()> {
    if !app.enter(Route::Login)? {
        return Ok(());
    }

    let email = or_ask(email, "Email")?;
    let password = or_ask(password, "Password")?;
    let route = app.session.login(&app.api, &email, &password).await?;
    greet(app, route);
    Ok(())
}

fn greet(app: &App, route: Route) {
    let name = app.session.current().map(|u| u.name).unwrap_or_default();
    println!("Welcome, {name}!");
    tracing::debug!(route = %route.path(), "signed in");
}

pub async fn logout(app: &App) -> Result<()> {
    if !app.session.is_authenticated() {
        println!("Not signed in");
        return Ok(());
    }
    app.session.logout(Some(&app.api)).await;
    println!("Signed out");
    Ok(())
}

pub async fn profile(app: &App, remote: bool) -> Result<()> {
    let user = app.require_signed_in()?;

    if remote {
        let profile = app.api.get_user_profile().await?;
        println!("{} <{}>", profile.name, profile.email);
        println!("  id:            {}", profile.id);
        println!("  gender:        {}", profile.gender);
        println!("  date of birth: {}", profile.date_of_birth);
        println!("  phone:         {}", profile.phone);
        return Ok(());
    }

    println!("{} <{}>", user.name, user.email);
    println!("  id:            {}", user.id);
    println!("  gender:        {}", user.gender);
    println!("  date of birth: {}", user.date_of_birth);
    println!("  phone:         {}", user.phone);
    if !user.created_at.is_empty() {
        println!("  member since:  {}", user.created_at);
    }
    Ok(())
}

pub fn whoami(app: &App) {
    match app.session.current() {
        Some(user) => println!("{} <{}>", user.name, user.email),
        None => println!("Not signed in"),
    }
}
