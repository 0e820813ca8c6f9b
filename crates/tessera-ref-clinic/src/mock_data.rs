//! Simulated clinic activity for the TESSERA reference scenarios.
//!
//! All people, patients, and addresses in this module are fictional. The
//! events mirror what a clinic-management front end would hand to the chain
//! builder: staff logins, record access, consent changes, break-glass access,
//! and billing.

use std::sync::Arc;

use tessera_contracts::{
    entry::{AuditContext, ComplianceFlags, NewAuditEvent},
    error::AuditResult,
};
use tessera_core::{KeyRing, SigningKey};

// ── Signing keys ──────────────────────────────────────────────────────────────

/// Key id of the demo signing key.
pub const DEMO_KEY_ID: &str = "clinic-demo-2026-01";

/// Fixed demo secret (hex). Never use outside the reference scenarios.
pub const DEMO_SIGNING_KEY_HEX: &str =
    "5f7e0c1d9a3b4e2f8c6d7a1b0e9f3c2d4a5b6c7d8e9f0a1b2c3d4e5f6a7b8c9d";

/// A key ring holding only the demo key.
pub fn demo_key_ring() -> AuditResult<Arc<KeyRing>> {
    let key = SigningKey::from_hex(DEMO_KEY_ID, DEMO_SIGNING_KEY_HEX)?;
    Ok(Arc::new(KeyRing::new(key)))
}

// ── Staff ─────────────────────────────────────────────────────────────────────

/// Fictional staff: (actor id, workstation IP).
pub const STAFF: [(&str, &str); 4] = [
    ("dr-helena-prado", "10.20.1.11"),
    ("dr-marcos-teles", "10.20.1.12"),
    ("enf-lucia-moura", "10.20.2.21"),
    ("recepcao-01", "10.20.0.5"),
];

const TENANT: &str = "clinica-aurora";
const USER_AGENT: &str = "aurora-web/4.2";

fn context(actor: &str, ip: &str) -> AuditContext {
    AuditContext::for_actor(actor)
        .tenant(TENANT)
        .source_ip(ip)
        .user_agent(USER_AGENT)
}

// ── Events ────────────────────────────────────────────────────────────────────

pub fn user_login(actor: &str, ip: &str) -> NewAuditEvent {
    NewAuditEvent::new("USER_LOGIN")
        .field("method", "password+totp")
        .field("password", "correct-horse-battery")
        .context(context(actor, ip))
        .flags(ComplianceFlags {
            access_control_enforced: true,
            ..ComplianceFlags::default()
        })
}

pub fn patient_registered(actor: &str, ip: &str, patient_id: &str) -> NewAuditEvent {
    NewAuditEvent::new("PATIENT_REGISTERED")
        .field("patient_id", patient_id)
        .field("cpf", "123.456.789-09")
        .context(context(actor, ip))
        .flags(ComplianceFlags::compliant())
}

pub fn consent_granted(actor: &str, ip: &str, patient_id: &str, scope: &str) -> NewAuditEvent {
    NewAuditEvent::new("CONSENT_GRANTED")
        .field("patient_id", patient_id)
        .field("scope", scope)
        .field("legal_basis", "explicit_consent")
        .context(context(actor, ip))
        .flags(ComplianceFlags::compliant())
}

pub fn consent_withdrawn(actor: &str, ip: &str, patient_id: &str, scope: &str) -> NewAuditEvent {
    NewAuditEvent::new("CONSENT_WITHDRAWN")
        .field("patient_id", patient_id)
        .field("scope", scope)
        .context(context(actor, ip))
        .flags(ComplianceFlags::compliant())
}

pub fn record_access(actor: &str, ip: &str, patient_id: &str) -> NewAuditEvent {
    NewAuditEvent::new("PATIENT_DATA_ACCESS")
        .field("patient_id", patient_id)
        .field("sections", vec!["allergies", "medications", "notes"])
        .context(context(actor, ip))
        .flags(ComplianceFlags::compliant())
}

/// Access attempted after consent was withdrawn. Recorded, not allowed.
pub fn record_access_denied(actor: &str, ip: &str, patient_id: &str) -> NewAuditEvent {
    NewAuditEvent::new("PATIENT_DATA_ACCESS_DENIED")
        .field("patient_id", patient_id)
        .field("reason", "consent withdrawn")
        .context(context(actor, ip))
        .flags(ComplianceFlags {
            data_protection_compliant: true,
            access_control_enforced: true,
            consent_validated: false,
            emergency_access: false,
        })
}

pub fn emergency_access(actor: &str, ip: &str, patient_id: &str, justification: &str) -> NewAuditEvent {
    NewAuditEvent::new("EMERGENCY_ACCESS")
        .field("patient_id", patient_id)
        .field("justification", justification)
        .context(context(actor, ip))
        .flags(ComplianceFlags::emergency())
}

pub fn prescription_created(actor: &str, ip: &str, patient_id: &str, drug: &str) -> NewAuditEvent {
    NewAuditEvent::new("PRESCRIPTION_CREATED")
        .field("patient_id", patient_id)
        .field("drug", drug)
        .context(context(actor, ip))
        .flags(ComplianceFlags::compliant())
}

pub fn payment_received(actor: &str, ip: &str, invoice: &str, amount_cents: i64) -> NewAuditEvent {
    NewAuditEvent::new("PAYMENT_RECEIVED")
        .field("invoice", invoice)
        .field("amount_cents", amount_cents)
        .field("card_number", "4111111111111111")
        .context(context(actor, ip))
        .flags(ComplianceFlags::compliant())
}

pub fn settings_updated(actor: &str, ip: &str, setting: &str) -> NewAuditEvent {
    NewAuditEvent::new("CLINIC_SETTINGS_UPDATED")
        .field("setting", setting)
        .context(context(actor, ip))
        .flags(ComplianceFlags {
            access_control_enforced: true,
            ..ComplianceFlags::default()
        })
}

pub fn backup_completed() -> NewAuditEvent {
    NewAuditEvent::new("BACKUP_COMPLETED")
        .field("size_mb", 412i64)
        .context(AuditContext::for_actor("system").tenant(TENANT))
}

/// A representative morning at the front desk and consulting rooms.
pub fn routine_morning() -> Vec<NewAuditEvent> {
    let [(helena, helena_ip), (marcos, marcos_ip), (lucia, lucia_ip), (desk, desk_ip)] = STAFF;
    vec![
        user_login(desk, desk_ip),
        patient_registered(desk, desk_ip, "patient-3107"),
        consent_granted(desk, desk_ip, "patient-3107", "treatment"),
        user_login(helena, helena_ip),
        record_access(helena, helena_ip, "patient-3107"),
        prescription_created(helena, helena_ip, "patient-3107", "amoxicillin 500mg"),
        user_login(lucia, lucia_ip),
        record_access(lucia, lucia_ip, "patient-2204"),
        user_login(marcos, marcos_ip),
        record_access(marcos, marcos_ip, "patient-1893"),
        payment_received(desk, desk_ip, "INV-2026-0412", 18_000),
        settings_updated(desk, desk_ip, "appointment_reminder_hours"),
        backup_completed(),
    ]
}
