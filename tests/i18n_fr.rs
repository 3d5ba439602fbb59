//! French boundary messages. Kept in its own test binary because the
//! language is set once per process.

use msgreader::i18n::{self, Lang};
use msgreader::scratch::ScratchDirectory;
use msgreader::session::{Session, SessionSettings};

#[test]
fn test_invalid_file_type_in_french() {
    i18n::set_lang(Lang::Fr);
    assert_eq!(i18n::lang(), Lang::Fr);

    let temp = tempfile::tempdir().unwrap();
    let scratch = temp.path().join("scratch");
    let mut session = Session::new(
        ScratchDirectory::new(&scratch),
        msgreader::launch::SystemLauncher::default(),
        SessionSettings::default(),
    );

    let path = temp.path().join("notes.txt");
    std::fs::write(&path, b"just text").unwrap();
    let request = serde_json::json!({"command": "load", "path": path}).to_string();
    let reply: serde_json::Value = serde_json::from_str(&session.handle_line(&request)).unwrap();

    assert_eq!(reply["status"], "error");
    assert_eq!(reply["error"], "invalid_upload");
    assert_eq!(reply["message"], "Type de fichier non valide.");
    assert!(!scratch.exists());
}
