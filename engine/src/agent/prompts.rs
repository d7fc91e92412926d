//! System prompts for the concierge agents

use sdk::types::TaskKind;

/// Reply the dispatcher gives when it cannot pick an agent
pub const DISPATCH_FAILED: &str = "FAILED";

pub fn concierge() -> String {
    "You are a helpful assistant helping a user navigate an automatic system diagram \
     reporter. Ask the user what they want to do and tell them what is available: \
     generating an architecture diagram from a description, searching the knowledge \
     base, looking up the price of a cloud service, and producing a report of the \
     session. When told that the user just completed a task, acknowledge it briefly \
     and ask what they would like to do next."
        .to_string()
}

pub fn orchestrator(agents: &[TaskKind]) -> String {
    let mut prompt = String::from(
        "You are an orchestration agent. Decide which agent should handle the user's \
         request and run it by calling the matching tool. Call exactly one tool. You do \
         not need to work out dependencies between agents; they handle that themselves.\n\n",
    );
    for kind in agents {
        prompt.push_str(&format!(
            "- {}: call {}\n",
            routing_hint(*kind),
            kind.emit_tool()
        ));
    }
    prompt.push_str(
        "- If the user wants small talk or help choosing, call emit_concierge\n\
         - If the user wants to stop or end the conversation, call emit_stop\n\n",
    );
    prompt.push_str(&format!(
        "If you cannot decide, do not call any tool and reply with exactly \"{}\".",
        DISPATCH_FAILED
    ));
    prompt
}

fn routing_hint(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::TextToDiagram => "If the user wants a system or architecture diagram",
        TaskKind::TextToRag => "If the user wants to search documentation or the knowledge base",
        TaskKind::PriceLookup => "If the user wants the price of a service",
        TaskKind::Report => "If the user wants a report of what was done",
        TaskKind::ImportFix => "If generated diagram code fails with import or syntax errors",
    }
}

pub fn task(kind: TaskKind) -> String {
    let body = match kind {
        TaskKind::TextToDiagram => {
            "You generate diagrams from text. Only produce diagrams with the \
             generate_diagram tool and trust its output. If it reports an error, \
             explain the error to the user and ask how to proceed."
        }
        TaskKind::TextToRag => {
            "You perform knowledge base searches. Only search with the search_rag tool, \
             never invent results, and trust its output even if it looks odd."
        }
        TaskKind::PriceLookup => {
            "You look up service prices. The user may not know the exact service name, \
             so find it with search_for_service first. Only look up names that \
             search_for_service returned, then call lookup_price."
        }
        TaskKind::Report => {
            "You produce a summary report of the session with the generate_report tool \
             and tell the user where it was written."
        }
        TaskKind::ImportFix => {
            "You repair generated diagram code. Run check_diagram_code to see the current \
             error, use suggest_imports for missing imports, and call fix_diagram_code \
             with the error until the check passes."
        }
    };
    format!(
        "{}\nOnce the task is complete you *must* call the tool named \"done\" before you \
         respond. If the user asks for anything else, call the tool \"need_help\" so another \
         agent can help.",
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_lists_only_enabled_agents() {
        let prompt = orchestrator(&[TaskKind::PriceLookup]);
        assert!(prompt.contains("emit_price_lookup"));
        assert!(!prompt.contains("emit_text_to_diagram"));
        assert!(prompt.contains("emit_stop"));
        assert!(prompt.contains("\"FAILED\""));
    }

    #[test]
    fn test_task_prompts_mention_handoff_tools() {
        for kind in TaskKind::ALL {
            let prompt = task(kind);
            assert!(prompt.contains("\"done\""));
            assert!(prompt.contains("\"need_help\""));
        }
    }
}
