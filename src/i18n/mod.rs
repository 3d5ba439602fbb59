//! Internationalization (i18n) module.
//!
//! Provides localized strings for boundary replies, rendered placeholders and
//! CLI output. English is the default language; French is available as an
//! alternative.

use std::sync::OnceLock;

static CURRENT_LANG: OnceLock<Lang> = OnceLock::new();

/// Supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    /// English (default)
    En,
    /// French
    Fr,
}

impl Lang {
    /// Language of a locale or code such as `fr`, `en_US` or `fr_FR.UTF-8`.
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.split(['_', '-', '.']).next()?;
        if primary.eq_ignore_ascii_case("en") {
            Some(Self::En)
        } else if primary.eq_ignore_ascii_case("fr") {
            Some(Self::Fr)
        } else {
            None
        }
    }

    /// Return the ISO 639-1 code for this language.
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }
}

/// Initialize the global language. Call once at startup.
/// If already initialized, this is a no-op.
pub fn set_lang(lang: Lang) {
    let _ = CURRENT_LANG.set(lang);
}

/// Get the currently configured language (defaults to English).
pub fn lang() -> Lang {
    CURRENT_LANG.get().copied().unwrap_or(Lang::En)
}

/// First recognized language among `MSGREADER_LANG`, `LC_ALL`, `LC_MESSAGES`
/// and `LANG`, else English.
pub fn detect_system_lang() -> Lang {
    ["MSGREADER_LANG", "LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| Lang::from_code(&value))
        .unwrap_or(Lang::En)
}

/// Macro for defining translatable message functions.
/// Each function returns a `&'static str` based on the current language.
macro_rules! msg {
    ($name:ident, $en:expr, $fr:expr) => {
        /// Returns a localized string for the current language.
        pub fn $name() -> &'static str {
            match lang() {
                Lang::En => $en,
                Lang::Fr => $fr,
            }
        }
    };
}

// ── General ──────────────────────────────────────────────────────

msg!(app_name, "MsgReader", "MsgReader");
msg!(
    app_about,
    "MsgReader \u{2014} Open Outlook .msg files, view them as safe HTML, extract attachments and export to .eml.",
    "MsgReader \u{2014} Ouvre les fichiers Outlook .msg, les affiche en HTML s\u{e9}curis\u{e9}, extrait les pi\u{e8}ces jointes et exporte en .eml."
);
msg!(
    app_long_about,
    "MsgReader \u{2014} Open Outlook .msg files.\nThe body is rendered as sanitized HTML with inline images resolved,\nattachments are saved to a scratch folder, and the message can be\nexported to the standard .eml format.",
    "MsgReader \u{2014} Ouvre les fichiers Outlook .msg.\nLe corps est rendu en HTML assaini avec les images int\u{e9}gr\u{e9}es r\u{e9}solues,\nles pi\u{e8}ces jointes sont enregistr\u{e9}es dans un dossier temporaire, et le\nmessage peut \u{ea}tre export\u{e9} au format standard .eml."
);

// ── CLI help strings ─────────────────────────────────────────────

msg!(
    help_cmd_open,
    "Open a .msg file and show its content (default if no subcommand given)",
    "Ouvrir un fichier .msg et afficher son contenu (par d\u{e9}faut sans sous-commande)"
);
msg!(
    help_cmd_export,
    "Export a .msg file to .eml in the scratch folder",
    "Exporter un fichier .msg en .eml dans le dossier temporaire"
);
msg!(
    help_cmd_serve,
    "Serve the command protocol on stdin/stdout (JSON lines)",
    "Servir le protocole de commandes sur stdin/stdout (lignes JSON)"
);
msg!(
    help_cmd_completions,
    "Generate shell completions",
    "G\u{e9}n\u{e9}rer les compl\u{e9}tions du shell"
);
msg!(
    help_cmd_manpage,
    "Generate a man page",
    "G\u{e9}n\u{e9}rer une page de manuel"
);

// ── Boundary errors ──────────────────────────────────────────────

msg!(err_no_file_received, "No file received.", "Aucun fichier re\u{e7}u.");
msg!(
    err_no_file_selected,
    "No file selected.",
    "Aucun fichier s\u{e9}lectionn\u{e9}."
);
msg!(
    err_invalid_file_type,
    "Invalid file type.",
    "Type de fichier non valide."
);
msg!(
    err_invalid_message,
    "Invalid or corrupt .msg file:",
    "Fichier .msg invalide ou corrompu :"
);
msg!(
    err_attachment_unreadable,
    "Unreadable attachment",
    "Pi\u{e8}ce jointe illisible"
);
msg!(
    err_body_unreadable,
    "Unable to read the message body.",
    "Impossible de lire le corps du message."
);
msg!(
    err_source_missing,
    "Original .msg file not found.",
    "Fichier .msg original non trouv\u{e9}."
);
msg!(err_export, "Export error:", "Erreur d'export :");
msg!(err_launch, "Could not open:", "Impossible d'ouvrir :");
msg!(
    err_link_rejected,
    "External link not allowed.",
    "Lien externe non autoris\u{e9}."
);
msg!(
    err_invalid_filename,
    "Invalid filename.",
    "Nom de fichier invalide."
);
msg!(err_file_not_found, "File not found.", "Fichier non trouv\u{e9}.");
msg!(
    err_no_message_loaded,
    "No message loaded.",
    "Aucun message charg\u{e9}."
);
msg!(err_io, "File error", "Erreur de fichier");
msg!(
    err_scratch_not_owned,
    "Folder is not empty and was not created by MsgReader, it will not be cleared:",
    "Dossier non vide non cr\u{e9}\u{e9} par MsgReader, il ne sera pas vid\u{e9} :"
);
msg!(
    err_bad_request,
    "Malformed request:",
    "Requ\u{ea}te mal form\u{e9}e :"
);

// ── Rendered body ────────────────────────────────────────────────

msg!(
    body_no_content,
    "(This message has no visible content.)",
    "(Ce message n'a pas de contenu visible.)"
);
msg!(body_error_label, "Error", "Erreur");

// ── EML export ───────────────────────────────────────────────────

msg!(
    eml_html_stub,
    "This message requires an HTML-capable mail client to be displayed correctly.",
    "Ce message n\u{e9}cessite un client mail compatible HTML pour \u{ea}tre affich\u{e9} correctement."
);
msg!(
    eml_no_content,
    "(This message has no content)",
    "(Ce message n'a pas de contenu)"
);

// ── CLI output ───────────────────────────────────────────────────

msg!(cli_subject, "Subject", "Objet");
msg!(cli_from, "From", "De");
msg!(cli_to, "To", "\u{c0}");
msg!(cli_cc, "Cc", "Cc");
msg!(cli_date, "Date", "Date");
msg!(cli_attachments, "Attachments", "Pi\u{e8}ces jointes");
msg!(cli_no_attachments, "(none)", "(aucune)");
msg!(cli_scratch, "Scratch folder", "Dossier temporaire");
msg!(cli_exported_to, "Exported to", "Export\u{e9} vers");
msg!(cli_preview, "Preview", "Aper\u{e7}u");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_from_code() {
        assert_eq!(Lang::from_code("en"), Some(Lang::En));
        assert_eq!(Lang::from_code("fr"), Some(Lang::Fr));
        assert_eq!(Lang::from_code("en_US"), Some(Lang::En));
        assert_eq!(Lang::from_code("fr_FR.UTF-8"), Some(Lang::Fr));
        assert_eq!(Lang::from_code("fr-CA"), Some(Lang::Fr));
        assert_eq!(Lang::from_code("es"), None);
    }

    #[test]
    fn test_lang_code_roundtrip() {
        assert_eq!(Lang::En.code(), "en");
        assert_eq!(Lang::Fr.code(), "fr");
    }

    #[test]
    fn test_default_lang_is_english() {
        // In tests, OnceLock may already be set, so we just verify the function works
        let l = lang();
        assert!(l == Lang::En || l == Lang::Fr);
    }

    #[test]
    fn test_messages_return_strings() {
        assert!(!app_name().is_empty());
        assert!(!err_invalid_file_type().is_empty());
        assert!(!body_no_content().is_empty());
        assert!(!eml_html_stub().is_empty());
    }
}
