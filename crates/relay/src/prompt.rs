//! The advisor persona: opening prompt, acknowledgment and apology texts.

use motoasesor_config::PersonaConfig;

const DEFAULT_NAME: &str = "MotoAsesor";

/// Role, personality and rules. The catalog fragment is appended right after it.
pub const SYSTEM_PREAMBLE: &str = "# ROL Y OBJETIVO\n\
Tú eres \"MotoAsesor\", un asistente virtual experto y amigable de nuestra concesionaria de motocicletas. \
Tu objetivo principal es ayudar a los clientes a encontrar la motocicleta perfecta para ellos de nuestro catálogo, \
brindando una experiencia de asesoramiento excepcional, amable y sin presiones.\n\
\n\
# PERSONALIDAD\n\
- Amable y Entusiasta: Saluda siempre con calidez. Usa un tono positivo y apasionado por las motocicletas.\n\
- Experto y Confiable: Demuestra conocimiento sobre los productos, pero solo sobre los que figuran en el catálogo. Nunca inventes información.\n\
- Paciente y Servicial: Escucha atentamente las necesidades del cliente. Haz preguntas para entender mejor lo que busca.\n\
- Asesor, no Vendedor Agresivo: Tu meta es guiar, no forzar una venta.\n\
\n\
# BASE DE CONOCIMIENTO (CATÁLOGO DE MOTOCICLETAS)\n\
Tu conocimiento se limita EXCLUSIVAMENTE a la siguiente lista de motocicletas disponibles. \
Si te preguntan por algo que no está en la lista, indica amablemente que no lo tienes en stock \
y redirige la conversación a los modelos disponibles.\n\
\n\
Aquí está el inventario actual:\n";

/// Canned assistant turn paired with the opening prompt.
pub const ACKNOWLEDGMENT: &str = "¡Entendido! Soy MotoAsesor. ¿En qué puedo ayudarte hoy?";

/// Sent instead of a reply when generation fails.
pub const APOLOGY: &str =
    "Lo siento, estoy teniendo problemas técnicos. Por favor, intenta de nuevo en un momento.";

/// Concatenate the default preamble and a formatted catalog.
pub fn build_opening(catalog: &str) -> String {
    format!("{SYSTEM_PREAMBLE}{catalog}")
}

/// The fixed texts the relay speaks with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub preamble: String,
    pub acknowledgment: String,
    pub apology: String,
}

impl Persona {
    /// Defaults, with the advisor's name substituted where it appears.
    /// Explicit overrides are used verbatim.
    pub fn from_config(config: &PersonaConfig) -> Self {
        let rename = |text: &str| text.replace(DEFAULT_NAME, &config.name);
        Self {
            name: config.name.clone(),
            preamble: config
                .system_prompt_override
                .clone()
                .unwrap_or_else(|| rename(SYSTEM_PREAMBLE)),
            acknowledgment: config
                .acknowledgment
                .clone()
                .unwrap_or_else(|| rename(ACKNOWLEDGMENT)),
            apology: config.apology.clone().unwrap_or_else(|| APOLOGY.to_string()),
        }
    }

    /// Preamble followed by `catalog`, in that order.
    pub fn opening_prompt(&self, catalog: &str) -> String {
        format!("{}{}", self.preamble, catalog)
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            preamble: SYSTEM_PREAMBLE.to_string(),
            acknowledgment: ACKNOWLEDGMENT.to_string(),
            apology: APOLOGY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NO_INVENTORY;

    #[test]
    fn preamble_precedes_catalog() {
        let opening = build_opening("| ID |\n");
        assert!(opening.starts_with("# ROL Y OBJETIVO"));
        assert!(opening.ends_with("Aquí está el inventario actual:\n| ID |\n"));
    }

    #[test]
    fn default_persona_matches_constants() {
        let persona = Persona::from_config(&PersonaConfig::default());
        assert_eq!(persona, Persona::default());
        assert_eq!(persona.opening_prompt(NO_INVENTORY), build_opening(NO_INVENTORY));
    }

    #[test]
    fn renamed_persona() {
        let persona = Persona::from_config(&PersonaConfig {
            name: "RutaBot".into(),
            ..PersonaConfig::default()
        });
        assert!(persona.preamble.contains("\"RutaBot\""));
        assert!(!persona.preamble.contains(DEFAULT_NAME));
        assert_eq!(persona.acknowledgment, "¡Entendido! Soy RutaBot. ¿En qué puedo ayudarte hoy?");
        assert_eq!(persona.apology, APOLOGY);
    }

    #[test]
    fn overrides_are_verbatim() {
        let persona = Persona::from_config(&PersonaConfig {
            system_prompt_override: Some("Eres un asesor.\n".into()),
            apology: Some("Ups".into()),
            ..PersonaConfig::default()
        });
        assert_eq!(persona.opening_prompt("tabla"), "Eres un asesor.\ntabla");
        assert_eq!(persona.apology, "Ups");
    }
}
