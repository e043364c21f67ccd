//! Static pre-execution gate for submitted scripts.
//!
//! A coarse syntactic filter: length ceiling plus a case-insensitive
//! substring denylist. First match wins and supplies the rejection reason.
//! Trivially bypassable by construction — the process isolation in the
//! executor is the actual security boundary; this only rejects the obvious
//! before paying for a worker spawn.

/// Denylisted patterns and the reason reported for each.
const DENYLIST: &[(&str, &str)] = &[
    ("import os", "OS module access is not allowed"),
    ("import sys", "System module access is not allowed"),
    ("import subprocess", "Subprocess module is not allowed"),
    ("import socket", "Network access is not allowed"),
    ("__import__", "Dynamic imports are not allowed"),
    ("eval(", "eval() is not allowed"),
    ("exec(", "exec() is not allowed"),
    ("compile(", "compile() is not allowed"),
    ("open(", "File operations are not allowed"),
    ("file(", "File operations are not allowed"),
    ("input(", "User input is not allowed"),
    ("raw_input(", "User input is not allowed"),
];

/// Validates a script before execution. `Ok(())` means the script may be
/// handed to the sandboxed executor; `Err` carries the rejection reason.
pub fn validate(code: &str, max_length: usize) -> Result<(), String> {
    if code.len() > max_length {
        return Err(format!("Code too long (max {max_length} characters)"));
    }

    let lowered = code.to_lowercase();
    for (pattern, reason) in DENYLIST {
        if lowered.contains(pattern) {
            return Err((*reason).to_string());
        }
    }

    Ok(())
}
