use std::io::{self, Write};

use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};
use rpassword::prompt_password;
use shared::{
    config::client::ClientConfig,
    models::{Identity, Registration, Role},
};

use super::{Context, GlobalOptions, print_json};

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Sign in with email and password
    Login(LoginArgs),
    /// Create an account and sign in
    Register(RegisterArgs),
    /// Show who is signed in
    Me,
    /// Forget the stored token
    Logout,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email; prompted for when omitted
    #[arg(long, short)]
    pub email: Option<String>,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long, short)]
    pub email: String,

    /// admin, alumni or student
    #[arg(long, short)]
    pub role: Role,

    /// Current occupation (alumni)
    #[arg(long)]
    pub occupation: Option<String>,

    /// Employer (alumni)
    #[arg(long)]
    pub company: Option<String>,

    /// Working domain (alumni)
    #[arg(long)]
    pub domain: Option<String>,

    /// Cumulative grade point average (students)
    #[arg(long)]
    pub cgpa: Option<f64>,

    /// Admission category (students)
    #[arg(long)]
    pub category: Option<String>,
}

pub async fn run(command: SessionCommand, config: ClientConfig, options: &GlobalOptions) -> Result<()> {
    match command {
        SessionCommand::Login(args) => login(args, &config, options).await,
        SessionCommand::Register(args) => register(args, &config, options).await,
        SessionCommand::Me => me(&config, options).await,
        SessionCommand::Logout => logout(&config),
    }
}

async fn login(args: LoginArgs, config: &ClientConfig, options: &GlobalOptions) -> Result<()> {
    let mut context = Context::open(config)?;

    let email = match args.email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = prompt_password("Password: ")?;
    if password.trim().is_empty() {
        bail!("password must not be empty");
    }

    let identity = context.session.login(email, password).await?.clone();
    report(&identity, &context, options)
}

async fn register(args: RegisterArgs, config: &ClientConfig, options: &GlobalOptions) -> Result<()> {
    let mut context = Context::open(config)?;

    let password = prompt_password("Password: ")?;
    if password.trim().is_empty() {
        bail!("password must not be empty");
    }

    let mut registration = Registration::new(args.name, args.email, password, args.role);
    registration.occupation = args.occupation;
    registration.company = args.company;
    registration.domain = args.domain;
    registration.cgpa = args.cgpa;
    registration.category = args.category;

    let identity = context.session.register(registration).await?.clone();
    report(&identity, &context, options)
}

async fn me(config: &ClientConfig, options: &GlobalOptions) -> Result<()> {
    let context = Context::resume(config).await?;
    let identity = context.user()?;
    report(identity, &context, options)
}

fn logout(config: &ClientConfig) -> Result<()> {
    let mut context = Context::open(config)?;
    let had_token = context.session.tokens().is_present();
    context.session.logout();

    if had_token {
        println!("Removed stored token at {}", context.token_path.display());
    } else {
        println!("No stored token found at {}", context.token_path.display());
    }
    Ok(())
}

fn report(identity: &Identity, context: &Context, options: &GlobalOptions) -> Result<()> {
    if options.json {
        return print_json(identity);
    }
    println!("Signed in as {} <{}>", identity.name, identity.email);
    println!("  id:    {}", identity.id);
    println!("  role:  {}", identity.role);
    if let Some(created_at) = identity.created_at {
        println!("  since: {}", created_at.format("%Y-%m-%d"));
    }
    println!("  token: {}", context.token_path.display());
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush().ok();
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("failed to read from stdin")?;
    let trimmed = input.trim().to_string();
    if trimmed.is_empty() {
        bail!("input must not be empty");
    }
    Ok(trimmed)
}
