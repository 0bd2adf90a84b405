//! prompts.rs — prompt templates for the LLM gateway.
//!
//! Plain string formatting, no control logic. The wording is part of the
//! system's observed behavior: severity is grounded ONLY in the FIR text
//! (never the label) to avoid circular reasoning from a possibly-wrong label,
//! and punishment is keyed only on the label.

/// Used when the statistical signal is weak and the LLM must identify the
/// applicable section(s) from the text alone.
pub fn deferred_section_prompt(fir_text: &str) -> String {
    format!(
        "You are an expert in Indian Penal Code.\n\n\
         Based ONLY on the FIR below, identify the most applicable IPC section(s).\n\
         Return IPC number and name.\n\n\
         FIR:\n{fir_text}\n\n\
         Respond concisely."
    )
}

/// Severity classification grounded only in the FIR text.
pub fn severity_prompt(fir_text: &str) -> String {
    format!(
        "Classify the crime severity as Low, Medium, or High\n\
         based ONLY on the FIR description.\n\n\
         FIR:\n{fir_text}\n\n\
         Give severity and short reason."
    )
}

/// Plain-language explanation of why the chosen section applies; grounded in
/// both the text and the label.
pub fn explanation_prompt(fir_text: &str, ipc_section: &str) -> String {
    format!(
        "Explain in simple legal terms why the following IPC section(s)\n\
         apply to the FIR.\n\n\
         FIR:\n{fir_text}\n\n\
         IPC:\n{ipc_section}"
    )
}

/// Punishment description keyed only on the label.
pub fn punishment_prompt(ipc_section: &str) -> String {
    format!(
        "Explain the punishment for IPC Section {ipc_section}\n\
         in simple language for common citizens."
    )
}
