//! Prompts behind the LLM-backed collaborators.

use kabot_core::collaborator::{CollaboratorExtras, Vehicle};
use kabot_core::message::Message;

pub const DEFAULT_ANNUAL_RATE_PCT: f64 = 13.0;
pub const DEFAULT_DOWN_PAYMENT: f64 = 0.20;
pub const DEFAULT_TERM_MONTHS: u32 = 36;

/// Monthly payment for `principal` at `annual_rate_pct` over `months`.
pub fn monthly_payment(principal: f64, annual_rate_pct: f64, months: u32) -> f64 {
    if months == 0 {
        return principal;
    }
    let r = annual_rate_pct / 100.0 / 12.0;
    if r == 0.0 {
        return principal / f64::from(months);
    }
    principal * r / (1.0 - (1.0 + r).powi(-(months as i32)))
}

pub fn financing_messages(user_input: &str, extras: &CollaboratorExtras) -> Vec<Message> {
    let vehicle = extras.vehicle.as_deref().unwrap_or_default();
    let example_price = 400_000.0;
    let example_payment = monthly_payment(
        example_price * (1.0 - DEFAULT_DOWN_PAYMENT),
        DEFAULT_ANNUAL_RATE_PCT,
        DEFAULT_TERM_MONTHS,
    );

    let instruction = format!(
        "Actúa como un asesor financiero especializado en la compra de automóviles.\n\n\
         Calcula en lenguaje natural un ejemplo estimado de financiamiento cuando el usuario hable \
         de mensualidades, plazos, tasas de interés o enganche.\n\n\
         Usa esta fórmula para el pago mensual aproximado:\n\
         PMT = (P * r) / (1 - (1 + r)^-n)\n\
         donde P es el monto a financiar (precio menos enganche), r la tasa mensual (anual / 12) y \
         n el número de meses.\n\n\
         Si el usuario no da otros valores usa estos:\n\
         <defaults>\n\
         <interes_anual>{rate}</interes_anual>\n\
         <enganche>{down:.2}</enganche>\n\
         <plazo_meses>{term}</plazo_meses>\n\
         </defaults>\n\n\
         Recibirás la información del vehículo así:\n\
         <vehiculo><precio>400000</precio><marca>Mazda</marca><modelo>Mazda 3</modelo>\
         <año>2021</año><version>2.5 S Grand Touring</version></vehiculo>\n\
         Si falta el precio búscalo en la conversación; si tampoco está, pide el precio aproximado.\n\n\
         Ejemplo de respuesta: \"Si el vehículo cuesta $400,000 MXN y lo financias a {term} meses \
         con un enganche del {down_pct:.0}%, tu pago mensual estimado sería de aproximadamente \
         ${example_payment:.0} MXN, con una tasa de interés anual del {rate}%.\"\n\n\
         No des consejos legales ni garantices la aprobación del crédito. Aclara que es un cálculo \
         estimado.",
        rate = DEFAULT_ANNUAL_RATE_PCT,
        down = DEFAULT_DOWN_PAYMENT,
        down_pct = DEFAULT_DOWN_PAYMENT * 100.0,
        term = DEFAULT_TERM_MONTHS,
    );

    vec![
        Message::system(instruction),
        Message::user(format!(
            "<usuario>{user_input}</usuario>\n<vehiculo>{vehicle}</vehiculo>"
        )),
    ]
}

const KAVAK_INFORMATION: &str = "\
Kavak es una plataforma mexicana líder en la compra y venta de autos seminuevos.

Compra segura y confiable:
- Todos los autos se certifican con una inspección de 240 puntos.
- Garantía de 3 meses, extendible a un año.
- Prueba de 7 días o 300 km con posibilidad de devolución.

Financiamiento flexible:
- Planes de pago a meses.
- Tu vehículo actual puede usarse como parte del pago.
- Trámite 100% digital, desde la cotización hasta la firma del contrato.

Proceso transparente:
- Precios competitivos.
- Soporte personalizado por videollamada.
- Contratos claros y sin letras pequeñas.

Venta simplificada:
- Hasta tres esquemas de pago por tu auto.
- Si tu auto cumple los estándares, Kavak lo recoge y lo paga.

Postventa:
- Aplicación para seguimiento de servicios, garantías y trámites.
- Asesoría constante y comunicación directa con el equipo de Kavak.

Presencia nacional: más de 15 sedes y 13 centros de inspección en México.
- Ciudad de México: Plaza Fortuna (Av Fortuna 334, Magdalena de las Salinas), Patio Santa Fe \
(Vasco de Quiroga 200-400), Antara Fashion Hall (Av Moliere, Polanco), El Rosario Town Center \
(El Rosario 1025, Azcapotzalco), Artz Pedregal (Periférico Sur 3720).
- Guadalajara: Midtown Guadalajara (Av Adolfo López Mateos Nte 1133), Punto Sur (Av. Punto Sur \
235, Tlajomulco de Zúñiga).
- Monterrey: Punto Valle (Río Missouri 555, San Pedro Garza García), Nuevo Sur (Av. Revolución \
2703, Colonia Ladrillera).
- Puebla: Explanada (Ignacio Allende 512, Santiago Momoxpan), Las Torres (Municipio Libre 1910).
- Querétaro: Puerta la Victoria (Av. Constituyentes 40, Villas del Sol).
- Cuernavaca: Forum Cuernavaca (Jacarandas 103, Ricardo Flores Magón).";

pub fn kavak_info_messages(user_input: &str) -> Vec<Message> {
    vec![
        Message::system(format!(
            "Eres un asistente experto en la plataforma Kavak.\n\n\
             Responde las preguntas del usuario sobre Kavak usando únicamente la información de \
             abajo. No inventes datos. Responde de forma clara, amable y precisa. Si piden \
             información general, resume los beneficios de Kavak. Si preguntan algo que no está \
             aquí, di que por ahora solo puedes dar información general sobre Kavak y sus \
             servicios.\n\n\
             <information>\n{KAVAK_INFORMATION}\n</information>"
        )),
        Message::user(user_input),
    ]
}

pub fn farewell_messages(user_input: &str, extras: &CollaboratorExtras) -> Vec<Message> {
    vec![Message::system(format!(
        "Eres un asistente conversacional cálido y amigable.\n\n\
         El usuario quiere terminar la conversación. Esta es la información disponible:\n\
         <user_input>{user_input}</user_input>\n\
         <working_memory>{working}</working_memory>\n\
         <facts>{facts}</facts>\n\
         <summary>{summary}</summary>\n\n\
         1. Revisa si se mencionó recientemente un vehículo (marca, modelo o año).\n\
         2. Si lo hay, destácalo en una frase breve que anime al usuario a considerarlo, siempre \
         que el usuario no lo haya rechazado.\n\
         3. Si no hay datos concretos no inventes nada: no menciones marcas, modelos ni precios que \
         no aparezcan arriba.\n\n\
         Después despídete con amabilidad, por ejemplo: \"¡Fue un gusto ayudarte, vuelve cuando \
         quieras!\".\n\n\
         Responde en lenguaje natural, sin JSON ni bloques de código. Solo una despedida clara, \
         cálida y concisa.",
        working = extras.working_memory,
        facts = extras.facts,
        summary = extras.summary,
    ))]
}

/// Ask for a short answer presenting the search results.
pub fn search_summary_messages(query: &str, vehicles: &[Vehicle]) -> Vec<Message> {
    let listing = if vehicles.is_empty() {
        "Sin resultados.".to_string()
    } else {
        vehicles
            .iter()
            .map(|v| format!("- [{}] {}", v.stock_id, v.description()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    vec![
        Message::system(format!(
            "Eres un asesor de ventas de autos seminuevos de Kavak.\n\n\
             El usuario hizo una búsqueda y estos son los vehículos encontrados:\n\
             <search_results>\n{listing}\n</search_results>\n\n\
             Presenta las opciones de forma breve y amable, destacando lo que coincide con la \
             búsqueda. Si no hay resultados, dilo y sugiere ajustar la búsqueda. No inventes \
             vehículos ni datos que no estén en la lista."
        )),
        Message::user(query),
    ]
}
