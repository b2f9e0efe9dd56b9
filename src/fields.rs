//! Enumerations and field types for planning tasks.
//!
//! This module defines the workflow status vocabulary used to track a task
//! from first draft through publication, plus the parsing and formatting
//! helpers shared by the CLI and the spreadsheet export.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Workflow status of a planning task.
///
/// Display labels keep the product's Portuguese vocabulary, which is also
/// what the exported spreadsheet's STATUS column carries.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    NotStarted,
    InCreation,
    AwaitingInformation,
    Published,
    Rework,
    Approved,
    AwaitingApproval,
    Finished,
}

/// Format a status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::NotStarted => "Não Iniciado",
        Status::InCreation => "Em Criação",
        Status::AwaitingInformation => "Aguardando Informação",
        Status::Published => "Publicada",
        Status::Rework => "Refação",
        Status::Approved => "Aprovado",
        Status::AwaitingApproval => "Aguardando Aprovação",
        Status::Finished => "Finalizado",
    }
}

/// Parse a status from its kebab-case or display form.
pub fn parse_status(s: &str) -> Option<Status> {
    match s.trim().to_lowercase().as_str() {
        "not-started" | "não iniciado" => Some(Status::NotStarted),
        "in-creation" | "em criação" => Some(Status::InCreation),
        "awaiting-information" | "aguardando informação" => Some(Status::AwaitingInformation),
        "published" | "publicada" => Some(Status::Published),
        "rework" | "refação" => Some(Status::Rework),
        "approved" | "aprovado" => Some(Status::Approved),
        "awaiting-approval" | "aguardando aprovação" => Some(Status::AwaitingApproval),
        "finished" | "finalizado" => Some(Status::Finished),
        _ => None,
    }
}
