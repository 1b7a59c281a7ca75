// crates/sqlgate-cli/src/lib.rs
// ============================================================================
// Module: SQL Gate CLI Library
// Description: Shared helpers for the SQL Gate command-line interface.
// Purpose: Keep bind-safety policy testable outside the binary.
// Dependencies: sqlgate-config
// ============================================================================

//! ## Overview
//! Houses the serve policy used by `sqlgate serve`. The binary entry point
//! (`src/main.rs`) imports it so the same rules are unit tested here.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Network exposure checks for `sqlgate serve`.
pub mod serve_policy;
