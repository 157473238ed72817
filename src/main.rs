use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursepay::config::Config;
use coursepay::db::{create_pool, init_db, queries, AppState};
use coursepay::handlers;
use coursepay::models::{CreateCourse, CreateUser};
use coursepay::notify::NotificationDispatcher;
use coursepay::payments::PaystackClient;

#[derive(Parser, Debug)]
#[command(name = "coursepay")]
#[command(about = "Payment-driven enrollment and referral settlement for an online-course marketplace")]
struct Cli {
    /// Seed the database with dev data (users and courses)
    #[arg(long)]
    seed: bool,
}

fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let course = queries::create_course(
        &conn,
        &CreateCourse {
            title: "Intro to Backend Engineering".to_string(),
            price_cents: 500_000,
            currency: "ngn".to_string(),
        },
    )
    .expect("Failed to seed course");

    let referrer = queries::create_user(
        &conn,
        &CreateUser {
            email: "referrer@example.com".to_string(),
            name: "Dev Referrer".to_string(),
            referral_code: None,
        },
    )
    .expect("Failed to seed referrer");

    let student = queries::create_user(
        &conn,
        &CreateUser {
            email: "student@example.com".to_string(),
            name: "Dev Student".to_string(),
            referral_code: None,
        },
    )
    .expect("Failed to seed student");

    queries::create_referral_relationship(&conn, &student.id, &referrer.id)
        .expect("Failed to seed referral relationship");

    tracing::info!(
        "Seeded course {} ({} {}), users {} and {} (referred)",
        course.id,
        course.price_cents,
        course.currency,
        referrer.id,
        student.id
    );
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursepay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    if config.gateway_secret_key.is_empty() && !config.dev_mode {
        tracing::warn!("GATEWAY_SECRET_KEY is not set - gateway calls will be rejected");
    }

    let pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = pool.get().expect("Failed to get db connection");
        init_db(&conn).expect("Failed to initialize schema");
    }

    let gateway = Arc::new(PaystackClient::new(
        &config.gateway_base_url,
        &config.gateway_secret_key,
    ));
    let notifier = NotificationDispatcher::spawn(pool.clone());

    let state = AppState {
        db: pool,
        gateway,
        notifier,
        base_url: config.base_url.clone(),
        referral_commission_percent: config.referral_commission_percent,
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::error!("--seed requires COURSEPAY_ENV=dev");
            std::process::exit(1);
        }
        seed_dev_data(&state);
    }

    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");
    axum::serve(listener, app).await.expect("Server error");
}
