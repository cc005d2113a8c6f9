use colored::*;
use serde_json::{json, Value};
use std::io::{self, Write};

struct Session {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "🚑 Dispatch Testing Tool".bright_blue().bold());
    println!("{}", "=====================================".bright_blue());
    println!();

    // Paso 1: Pedir servidor y token
    let session = get_session()?;

    // Paso 2: Menú principal
    loop {
        println!();
        println!("{}", "📋 MENÚ PRINCIPAL".bright_green().bold());
        println!("{}", "==================".bright_green());
        println!("1. 🚑 Listar ambulancias");
        println!("2. 🆘 Crear despacho");
        println!("3. ⏩ Avanzar estado de un despacho");
        println!("4. 📊 Disponibilidad actual");
        println!("5. 🚪 Salir");
        print!("{}", "Selecciona una opción (1-5): ".bright_yellow());
        io::stdout().flush()?;

        let choice = read_line()?;
        let result = match choice.as_str() {
            "1" => list_vehicles(&session).await,
            "2" => create_dispatch(&session).await,
            "3" => advance_status(&session).await,
            "4" => show_availability(&session).await,
            "5" => {
                println!("{}", "👋 ¡Hasta luego!".bright_green());
                break;
            }
            _ => {
                println!("{}", "❌ Opción inválida. Intenta de nuevo.".bright_red());
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("{} {}", "❌ Error:".bright_red(), e);
        }
    }

    Ok(())
}

fn read_line() -> Result<String, Box<dyn std::error::Error>> {
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

fn prompt(label: &str) -> Result<String, Box<dyn std::error::Error>> {
    print!("{}", label.bright_yellow());
    io::stdout().flush()?;
    read_line()
}

fn get_session() -> Result<Session, Box<dyn std::error::Error>> {
    println!("{}", "🔐 CONEXIÓN".bright_cyan().bold());
    println!("{}", "===========".bright_cyan());

    let base_url = prompt("URL del servicio [http://localhost:8001]: ")?;
    let base_url = if base_url.is_empty() {
        "http://localhost:8001".to_string()
    } else {
        base_url.trim_end_matches('/').to_string()
    };
    let token = prompt("Token (vacío si no hay autenticación): ")?;

    Ok(Session {
        client: reqwest::Client::new(),
        base_url,
        token: if token.is_empty() { None } else { Some(token) },
    })
}

async fn send(
    session: &Session,
    request: reqwest::RequestBuilder,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = match &session.token {
        Some(token) => request.bearer_auth(token),
        None => request,
    };
    let response = request.send().await?;
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    let label = format!("📥 HTTP {}", status.as_u16());
    if status.is_success() {
        println!("{}", label.bright_green());
    } else {
        println!("{}", label.bright_red());
    }
    Ok(body)
}

async fn list_vehicles(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/api/v1/vehicles", session.base_url);
    let body = send(session, session.client.get(&url)).await?;

    if let Some(vehicles) = body.as_array() {
        for vehicle in vehicles {
            println!(
                "  #{} {} [{}] {}",
                vehicle["id"],
                vehicle["plate"].as_str().unwrap_or("?").bright_white().bold(),
                vehicle["category"].as_str().unwrap_or("?"),
                vehicle["status"].as_str().unwrap_or("?").bright_cyan()
            );
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&body)?);
    }
    Ok(())
}

async fn create_dispatch(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let lat: f64 = prompt("Latitud de origen [-16.5]: ")?.parse().unwrap_or(-16.5);
    let lng: f64 = prompt("Longitud de origen [-68.15]: ")?.parse().unwrap_or(-68.15);
    let priority = prompt("Prioridad (low/medium/high/critical) [high]: ")?;
    let priority = if priority.is_empty() { "high".to_string() } else { priority };

    let payload = json!({
        "origin_lat": lat,
        "origin_lng": lng,
        "priority": priority,
        "incident": "medical_emergency",
    });
    println!("{}", "📦 Payload:".bright_blue());
    println!("{}", serde_json::to_string_pretty(&payload)?);

    let url = format!("{}/api/v1/dispatches", session.base_url);
    let body = send(session, session.client.post(&url).json(&payload)).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn advance_status(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let id = prompt("ID del despacho: ")?;
    let status = prompt("Nuevo estado (en_route/on_scene/transporting/completed/cancelled): ")?;

    let url = format!("{}/api/v1/dispatches/{}/status", session.base_url, id);
    let body = send(session, session.client.patch(&url).json(&json!({ "status": status }))).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn show_availability(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/api/v1/availability", session.base_url);
    let body = send(session, session.client.get(&url)).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
