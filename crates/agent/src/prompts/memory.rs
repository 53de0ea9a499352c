//! Fact and summary merge prompts.

use kabot_core::message::{render_transcript, Message};

/// Stands in for the fact list when nothing is known yet.
pub const NO_FACTS_MARKER: &str = "Ninguno";

/// Returned instead of a summary when there is nothing to summarize.
pub const SUMMARY_SENTINEL: &str =
    "No hay historial ni resumen previo disponible. No es posible generar un resumen en este momento.";

/// Rules every summary prompt carries about proposals and rejections.
const SUMMARY_POLICY: &str = "Reglas obligatorias:\n\
- No atribuyas al usuario un vehículo, plan o decisión que el asistente solo propuso; \
registra únicamente lo que el usuario aceptó de forma explícita.\n\
- Si el usuario rechazó algo de forma explícita, consérvalo como un hecho negativo \
(por ejemplo: \"El usuario rechazó el Mazda 3 2021\").\n\
- Nunca presentes un elemento rechazado como recomendación o preferencia del usuario.";

/// Ask for the old facts merged with what the transcript reveals.
pub fn fact_merge_prompt(old_facts: &str, recent: &[Message]) -> Message {
    let known = if old_facts.is_empty() {
        NO_FACTS_MARKER
    } else {
        old_facts
    };
    let transcript = render_transcript(recent);

    Message::system(format!(
        "Actúa como un motor que extrae y mantiene hechos relevantes sobre el usuario de una \
         inteligencia artificial conversacional.\n\n\
         Tienes dos tareas:\n\
         1. Extrae del historial los hechos persistentes del usuario: nombre, preferencias, gustos, \
         datos de contacto o cualquier dato útil para personalizar respuestas futuras.\n\
         2. Fusiónalos con los hechos conocidos. Si un hecho nuevo contradice uno previo (por \
         ejemplo, cambia su marca favorita), actualiza el valor con lo último que se mencionó. Si lo \
         complementa, añádelo sin eliminar lo ya guardado.\n\n\
         Si los hechos conocidos son '{NO_FACTS_MARKER}', construye la estructura desde cero a partir \
         de la conversación.\n\n\
         Hechos conocidos:\n{known}\n\n\
         Historial reciente:\n<conversation>\n{transcript}\n</conversation>\n\n\
         Devuelve únicamente un objeto JSON plano con los hechos actualizados, con valores de texto. \
         No lo encierres en bloques de código ni agregues explicaciones."
    ))
}

/// Ask for a TL;DR of a conversation with no earlier summary.
pub fn fresh_summary_prompt(recent: &[Message]) -> Message {
    let transcript = render_transcript(recent);
    Message::system(format!(
        "Actúa como la memoria de resumen de una inteligencia artificial conversacional.\n\n\
         Genera un TL;DR en tercera persona de los mensajes recientes entre un usuario y un \
         asistente. Captura la intención, el tono, las preguntas importantes, las respuestas clave y \
         cualquier dato personal relevante.\n\n\
         {SUMMARY_POLICY}\n\n\
         Mensajes recientes:\n<conversation>\n{transcript}\n</conversation>\n\n\
         Devuelve únicamente el resumen. No incluyas encabezados ni explicaciones."
    ))
}

/// Ask for a new TL;DR fused with `previous`.
pub fn fused_summary_prompt(previous: &str, recent: &[Message]) -> Message {
    let transcript = render_transcript(recent);
    Message::system(format!(
        "Actúa como la memoria de resumen de una inteligencia artificial conversacional.\n\n\
         Tu tarea tiene dos pasos:\n\
         1. Lee los mensajes recientes entre un usuario y un asistente y genera un TL;DR en tercera \
         persona con su intención, tono, preguntas importantes, respuestas clave y datos personales \
         relevantes.\n\
         2. Fusiona ese TL;DR con el resumen anterior en uno solo, coherente y compacto. Lo que el \
         resumen anterior registra como rechazado sigue rechazado salvo que el usuario diga lo \
         contrario de forma explícita.\n\n\
         {SUMMARY_POLICY}\n\n\
         Resumen anterior:\n{previous}\n\n\
         Mensajes recientes:\n<conversation>\n{transcript}\n</conversation>\n\n\
         Devuelve únicamente el nuevo resumen combinado. No incluyas encabezados ni explicaciones."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_prompt_uses_marker_when_empty() {
        let prompt = fact_merge_prompt("", &[Message::user("Me llamo Ana")]);
        assert!(prompt.content.contains("Hechos conocidos:\nNinguno"));
        assert!(prompt.content.contains("<conversation>\nuser: Me llamo Ana\n</conversation>"));
    }

    #[test]
    fn fact_prompt_lists_known_facts() {
        let prompt = fact_merge_prompt("nombre: Ana", &[Message::user("Prefiero Toyota")]);
        assert!(prompt.content.contains("Hechos conocidos:\nnombre: Ana"));
    }

    #[test]
    fn both_summary_prompts_carry_rejection_policy() {
        let recent = [Message::assistant("Te sugiero el Mazda 3"), Message::user("No me gusta")];
        for prompt in [fresh_summary_prompt(&recent), fused_summary_prompt("previo", &recent)] {
            assert!(prompt.content.contains("hecho negativo"));
            assert!(prompt.content.contains("Nunca presentes un elemento rechazado"));
            assert!(prompt.content.contains("solo propuso"));
        }
    }

    #[test]
    fn fused_prompt_includes_previous_summary() {
        let prompt = fused_summary_prompt("El usuario busca un SUV.", &[Message::user("Hola")]);
        assert!(prompt.content.contains("Resumen anterior:\nEl usuario busca un SUV."));
    }
}
