//! Intent classification, context block and working-memory seed prompts.

use kabot_core::intent::IntentKind;
use kabot_core::message::Message;

/// First message of a freshly seeded working memory.
pub const SEED_PREAMBLE: &str = "El siguiente contexto se recuperó de la memoria para ayudarte a \
entender al usuario. No lo repitas.";

/// When the rule for `kind` applies, and the JSON to answer with.
fn intent_rule(kind: IntentKind) -> &'static str {
    match kind {
        IntentKind::Exit => {
            "El usuario se despide o da por terminada la conversación (\"gracias\", \"nos vemos\", \
             \"hasta luego\"). Responde: {\"intention\": \"exit\"}"
        }
        IntentKind::KavakInfo => {
            "El usuario pregunta por Kavak: cómo funciona, sus servicios, sus sedes o información \
             general de la empresa. Responde: {\"intention\": \"kavak_info\"}"
        }
        IntentKind::Search => {
            "El mensaje es una consulta para buscar vehículos. Responde: {\"intention\": \"search\"}"
        }
        IntentKind::Financing => {
            "El mensaje trata de financiamiento, mensualidades o pagar un vehículo a crédito. Si \
             identificas el vehículo (por el mensaje o la memoria de trabajo) inclúyelo en XML: \
             {\"intention\": \"financing\", \"vehicle\": \"<vehiculo>...</vehiculo>\"}. Si no lo \
             identificas con certeza responde solo {\"intention\": \"financing\"}"
        }
        IntentKind::EpisodicMemory => {
            "El mensaje necesita información mencionada en conversaciones anteriores que no está en \
             la memoria de trabajo. Responde: {\"intention\": \"episodic_memory\"}"
        }
        IntentKind::None => {
            "Cualquier otro caso: contesta tú mismo. Responde: {\"intention\": \"none\", \
             \"response\": \"<respuesta>\"}"
        }
    }
}

/// The classifier's system instruction, rendered from [`IntentKind::PRECEDENCE`].
pub fn intent_instruction() -> Message {
    let order = IntentKind::PRECEDENCE
        .iter()
        .map(IntentKind::as_str)
        .collect::<Vec<_>>()
        .join(" > ");

    let rules = IntentKind::PRECEDENCE
        .iter()
        .enumerate()
        .map(|(i, kind)| format!("{}. {}: {}", i + 1, kind.as_str(), intent_rule(*kind)))
        .collect::<Vec<_>>()
        .join("\n");

    Message::system(format!(
        "Actúas como un asistente conversacional inteligente.\n\n\
         Se te proporciona un contexto de memoria en formato XML:\n\
         <context>\n\
         <fact_memory> ... </fact_memory>\n\
         <summary_memory> ... </summary_memory>\n\
         <working_memory> ... </working_memory>\n\
         </context>\n\n\
         El mensaje del usuario llega como <user_input> ... </user_input>.\n\n\
         Identifica la intención del mensaje. Evalúa las reglas en este orden de prioridad \
         ({order}) y devuelve solo la primera que aplique, como un único objeto JSON:\n\
         {rules}\n\n\
         Si ya tienes contexto y el mensaje es un saludo (\"Hola\", \"hey\", \"hola de nuevo\"), \
         usa algo de ese contexto para enriquecer tu respuesta.\n\n\
         Analiza tanto el contexto como <user_input>. No incluyas encabezados, explicaciones ni \
         ningún otro contenido."
    ))
}

/// The `<context>` block holding the three memory views.
pub fn context_block(facts: &str, summary: &str, working: &str) -> Message {
    Message::system(format!(
        "<context>\n\
         <fact_memory>{facts}</fact_memory>\n\
         <summary_memory>{summary}</summary_memory>\n\
         <working_memory>{working}</working_memory>\n\
         </context>"
    ))
}

/// The `<context>` block used when the full episodic history is reissued.
pub fn history_block(facts: &str, summary: &str, history: &str) -> Message {
    Message::system(format!(
        "<context>\n\
         <fact_memory>{facts}</fact_memory>\n\
         <summary_memory>{summary}</summary_memory>\n\
         <history>\n{history}\n</history>\n\
         </context>"
    ))
}

pub fn user_input(input: &str) -> Message {
    Message::user(format!("<user_input>{input}</user_input>"))
}

/// Instruction, context and input for one classification call.
pub fn intent_messages(facts: &str, summary: &str, working: &str, input: &str) -> Vec<Message> {
    vec![
        intent_instruction(),
        context_block(facts, summary, working),
        user_input(input),
    ]
}

/// Instruction, full-history context and input for an episodic recall.
pub fn episodic_messages(facts: &str, summary: &str, history: &str, input: &str) -> Vec<Message> {
    vec![
        intent_instruction(),
        history_block(facts, summary, history),
        user_input(input),
    ]
}

/// System messages that open a new working memory.
///
/// Empty when there are neither facts nor a summary.
pub fn seed_messages(facts: &str, summary: &str) -> Vec<Message> {
    let mut seed = Vec::new();
    if !facts.is_empty() {
        seed.push(Message::system(format!(
            "<context>Hechos relevantes: {facts}</context>"
        )));
    }
    if !summary.is_empty() {
        seed.push(Message::system(format!("<context>{summary}</context>")));
    }
    if !seed.is_empty() {
        seed.insert(0, Message::system(SEED_PREAMBLE));
    }
    seed
}
