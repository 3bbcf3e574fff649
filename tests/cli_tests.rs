use predicates::prelude::*;
use predicates::str::contains;
use std::fs;

mod common;
use common::{
    EMAIL, Home, PASSWORD, accept_terms, id_after, init_with_user, login, reset_token, rpo, sign_in,
};

#[test]
fn init_creates_database_and_config() {
    let home = Home::new();
    rpo(&home)
        .arg("init")
        .assert()
        .success()
        .stdout(contains("initialization completed"));

    assert!(home.file("rponto.sqlite").exists());
    assert!(home.file("rponto.conf").exists());
}

#[test]
fn commands_need_a_session() {
    let home = Home::new();
    init_with_user(&home);
    rpo(&home)
        .arg("suggest")
        .assert()
        .failure()
        .stderr(contains("Not authenticated"));
}

#[test]
fn wrong_password_is_rejected() {
    let home = Home::new();
    init_with_user(&home);
    rpo(&home)
        .args(["login", "--email", EMAIL, "--password", "nope"])
        .assert()
        .failure()
        .stderr(contains("Invalid login credentials"));
}

#[test]
fn features_wait_for_the_terms_of_use() {
    let home = Home::new();
    init_with_user(&home);
    sign_in(&home, "phone");

    rpo(&home)
        .args(["--device", "phone", "suggest"])
        .assert()
        .failure()
        .stderr(contains("Terms of use version 1.0 not accepted"));
    rpo(&home)
        .args(["--device", "phone", "whoami"])
        .assert()
        .success();
    rpo(&home)
        .args(["--device", "phone", "terms"])
        .assert()
        .success()
        .stdout(contains("você deve aceitar os novos termos de uso"));

    rpo(&home)
        .args(["--device", "phone", "terms", "--accept"])
        .assert()
        .failure()
        .stdout(contains("Permissão Necessária"))
        .stderr(contains("Location permission required"));

    rpo(&home)
        .args([
            "--device", "phone", "terms", "--accept", "--lat", "-23.5", "--lng", "-46.6",
        ])
        .assert()
        .success()
        .stdout(contains("Termos aceitos. Bem-vindo de volta!"));
    rpo(&home)
        .args(["--device", "phone", "suggest"])
        .assert()
        .success();
    rpo(&home)
        .args(["--device", "phone", "terms"])
        .assert()
        .success()
        .stdout(contains("Aceitos em"));
}

#[test]
fn terms_are_accepted_once_per_user() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "phone");
    sign_in(&home, "tablet");

    rpo(&home)
        .args(["--device", "tablet", "occurrences"])
        .assert()
        .success();
    accept_terms(&home, "tablet");
}

#[test]
fn password_reset_replaces_the_password() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "phone");

    rpo(&home)
        .args(["forgot-password", "--email", ""])
        .assert()
        .failure()
        .stderr(contains("Por favor, informe seu e-mail."));
    rpo(&home)
        .args(["forgot-password", "--email", EMAIL])
        .assert()
        .success()
        .stdout(contains("Link de redefinição enviado! Verifique seu e-mail."));

    let token = reset_token(&home);
    rpo(&home)
        .args(["reset-password", "--token", &token, "--password", "n0va-senha"])
        .assert()
        .success();
    rpo(&home)
        .args(["reset-password", "--token", &token, "--password", "outra"])
        .assert()
        .failure()
        .stderr(contains("Invalid or expired password reset link"));

    // every session of the account ends with the old password
    rpo(&home)
        .args(["--device", "phone", "whoami"])
        .assert()
        .failure()
        .stderr(contains("Not authenticated"));
    rpo(&home)
        .args(["login", "--email", EMAIL, "--password", PASSWORD])
        .assert()
        .failure();
    rpo(&home)
        .args(["login", "--email", EMAIL, "--password", "n0va-senha"])
        .assert()
        .success();
}

#[test]
fn unknown_address_gets_the_same_answer() {
    let home = Home::new();
    init_with_user(&home);
    rpo(&home)
        .args(["forgot-password", "--email", "ninguem@example.com"])
        .assert()
        .success()
        .stdout(contains("Link de redefinição enviado!"));
    assert!(!home.path().join("storage").join("mailbox").exists());
}

#[test]
fn whoami_shows_the_profile() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "phone");

    rpo(&home)
        .args(["--device", "phone", "whoami"])
        .assert()
        .success()
        .stdout(contains(EMAIL))
        .stdout(contains("Ana Souza - Analista"))
        .stdout(contains("protection: active"));
}

#[test]
fn empty_day_suggests_entry() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    rpo(&home)
        .arg("suggest")
        .assert()
        .success()
        .stdout(contains("ENTRADA"))
        .stdout(contains("Vamos começar o dia?"));
}

#[test]
fn punch_follows_the_suggestion() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    rpo(&home)
        .args(["punch", "--lat=-23.55", "--lng=-46.63", "--accuracy", "5"])
        .assert()
        .success()
        .stdout(contains("ENTRADA registrada"));

    rpo(&home)
        .arg("suggest")
        .assert()
        .success()
        .stdout(contains("SAÍDA ALMOÇO"));
}

#[test]
fn mocked_position_flags_the_punch() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    rpo(&home)
        .args(["punch", "ENTRY", "--lat=-23.55", "--lng=-46.63", "--mocked"])
        .assert()
        .success()
        .stdout(contains("Localização simulada"));

    rpo(&home)
        .arg("history")
        .assert()
        .success()
        .stdout(contains("FLAGGED"));
}

#[test]
fn punch_without_location_is_refused() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    rpo(&home)
        .args(["punch", "ENTRY"])
        .assert()
        .failure()
        .stderr(contains("Location permission required"));

    rpo(&home)
        .arg("history")
        .assert()
        .success()
        .stdout(contains("Nenhum registro"));
}

#[test]
fn failed_biometric_blocks_the_punch() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    rpo(&home)
        .args(["punch", "--lat=1", "--lng=1", "--biometric", "failed"])
        .assert()
        .failure()
        .stderr(contains("Biometric confirmation failed"));
}

#[test]
fn second_device_login_closes_the_first() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "phone");
    login(&home, "tablet");

    rpo(&home)
        .args(["--device", "phone", "whoami"])
        .assert()
        .failure()
        .stdout(contains("Aviso de Segurança"))
        .stdout(contains("Você conectou em outro dispositivo"))
        .stderr(contains("Session expired"));

    // the notice is shown once; afterwards the device is simply signed out
    rpo(&home)
        .args(["--device", "phone", "whoami"])
        .assert()
        .failure()
        .stdout(contains("Aviso de Segurança").not())
        .stderr(contains("Not authenticated"));

    rpo(&home)
        .args(["--device", "tablet", "watch", "--once"])
        .assert()
        .success()
        .stdout(contains("Session active."));
}

#[test]
fn vacuum_keeps_unread_session_changes() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "phone");
    login(&home, "tablet");

    rpo(&home)
        .args(["db", "--vacuum"])
        .assert()
        .success()
        .stdout(contains("change event(s) pruned"))
        .stdout(contains("Vacuum completed"));

    rpo(&home)
        .args(["--device", "phone", "whoami"])
        .assert()
        .failure()
        .stdout(contains("Aviso de Segurança"));
}

#[test]
fn refresh_does_not_kick_the_same_device() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "phone");

    rpo(&home)
        .args(["--device", "phone", "refresh"])
        .assert()
        .success();
    rpo(&home)
        .args(["--device", "phone", "whoami"])
        .assert()
        .success()
        .stdout(contains("Aviso de Segurança").not());
}

#[test]
fn logout_forgets_the_device_session() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "phone");

    rpo(&home)
        .args(["--device", "phone", "logout"])
        .assert()
        .success()
        .stdout(contains("Signed out."));
    rpo(&home)
        .args(["--device", "phone", "logout"])
        .assert()
        .success()
        .stdout(contains("No session"));
}

#[test]
fn medical_certificate_needs_an_attachment() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    rpo(&home)
        .args(["leave", "new", "--type", "ATESTADO", "--start", "2030-05-10"])
        .assert()
        .failure()
        .stderr(contains("attachment is required"));

    let proof = home.file("atestado.pdf");
    fs::write(&proof, b"%PDF-1.4 fake").unwrap();
    rpo(&home)
        .args([
            "leave",
            "new",
            "--type",
            "ATESTADO",
            "--start",
            "2030-05-10",
            "--end",
            "2030-05-12",
            "--attach",
            &proof.to_string_lossy(),
        ])
        .assert()
        .success()
        .stdout(contains("3 dia(s)"));

    rpo(&home)
        .args(["leave", "list"])
        .assert()
        .success()
        .stdout(contains("Atestado"))
        .stdout(contains("Pendente"));
}

#[test]
fn leave_end_before_start_is_rejected() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    rpo(&home)
        .args([
            "leave", "new", "--type", "FOLGA", "--start", "2030-05-10", "--end", "2030-05-01",
        ])
        .assert()
        .failure();
}

#[test]
fn approved_leave_shows_up_as_upcoming() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    let out = rpo(&home)
        .args([
            "leave", "new", "--type", "FERIAS", "--start", "2031-01-05", "--end", "2031-01-09",
        ])
        .assert()
        .success();
    assert!(String::from_utf8_lossy(&out.get_output().stdout).contains("5 dia(s)"));

    rpo(&home)
        .args(["leave", "upcoming"])
        .assert()
        .success()
        .stdout(contains("Nenhum afastamento"));
}

#[test]
fn published_document_can_be_signed_once() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    let payslip = home.file("holerite.pdf");
    fs::write(&payslip, b"%PDF-1.4 payslip").unwrap();
    let out = rpo(&home)
        .args([
            "admin",
            "add-document",
            "--email",
            EMAIL,
            "--file",
            &payslip.to_string_lossy(),
            "--month",
            "3",
            "--year",
            "2025",
        ])
        .assert()
        .success();
    let doc_id = id_after(&out.get_output().stdout, "published");

    rpo(&home)
        .args(["docs", "list", "--year", "2025"])
        .assert()
        .success()
        .stdout(contains("holerite.pdf"))
        .stdout(contains("pendente"));

    let signature = home.file("signature.txt");
    fs::write(&signature, "data:image/png;base64,iVBORw0KGgo=").unwrap();
    let sig = signature.to_string_lossy().to_string();

    rpo(&home)
        .args(["docs", "sign", &doc_id, "--signature", &sig])
        .assert()
        .success()
        .stdout(contains("Documento assinado"));

    rpo(&home)
        .args(["docs", "sign", &doc_id, "--signature", &sig])
        .assert()
        .success()
        .stdout(contains("já assinado"));
}

#[test]
fn signing_an_unknown_document_fails() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    let signature = home.file("signature.txt");
    fs::write(&signature, "iVBORw0KGgo=").unwrap();
    rpo(&home)
        .args([
            "docs",
            "sign",
            "no-such-doc",
            "--signature",
            &signature.to_string_lossy(),
        ])
        .assert()
        .failure()
        .stderr(contains("Document not found"));
}

#[test]
fn uploaded_file_is_listed() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    let file = home.file("comprovante.png");
    fs::write(&file, [0x89, b'P', b'N', b'G']).unwrap();
    rpo(&home)
        .args(["docs", "upload", &file.to_string_lossy()])
        .assert()
        .success()
        .stdout(contains("Documento enviado"));

    rpo(&home)
        .args(["docs", "list"])
        .assert()
        .success()
        .stdout(contains("comprovante.png"));
}

#[test]
fn profile_hides_documents_unless_revealed() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    rpo(&home)
        .arg("profile")
        .assert()
        .success()
        .stdout(contains("Ana Souza"))
        .stdout(contains("•••••••••••"))
        .stdout(contains("123.456.789-01").not());

    rpo(&home)
        .args(["profile", "--reveal"])
        .assert()
        .success()
        .stdout(contains("123.456.789-01"));
}

#[test]
fn occurrences_are_listed() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    rpo(&home)
        .args([
            "admin",
            "add-occurrence",
            "--email",
            EMAIL,
            "--title",
            "Atraso recorrente",
            "--date",
            "2025-02-10",
            "--severity",
            "2",
        ])
        .assert()
        .success();

    rpo(&home)
        .arg("occurrences")
        .assert()
        .success()
        .stdout(contains("Atraso recorrente"));
}

#[test]
fn history_exports_to_csv() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    rpo(&home)
        .args(["punch", "ENTRY", "--lat=-23.55", "--lng=-46.63"])
        .assert()
        .success();

    let out = home.file("punches.csv");
    rpo(&home)
        .args(["history", "--export", "csv", "--file", &out.to_string_lossy()])
        .assert()
        .success()
        .stdout(contains("1 punches exported"));

    let csv = fs::read_to_string(&out).unwrap();
    assert!(csv.lines().next().unwrap().contains("type"));
    assert!(csv.contains("ENTRY"));
    assert!(csv.contains("VALID"));
}

#[test]
fn relative_export_path_is_rejected() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    rpo(&home)
        .args(["punch", "ENTRY", "--lat=1", "--lng=1"])
        .assert()
        .success();
    rpo(&home)
        .args(["history", "--export", "json", "--file", "out.json"])
        .assert()
        .failure()
        .stderr(contains("must be absolute"));
}

#[test]
fn log_records_session_activity() {
    let home = Home::new();
    init_with_user(&home);
    login(&home, "mobile");

    rpo(&home)
        .args(["log", "--print"])
        .assert()
        .success()
        .stdout(contains("login"))
        .stdout(contains("add_user"));
}

#[test]
fn password_is_not_stored_in_clear() {
    let home = Home::new();
    init_with_user(&home);
    let raw = fs::read(home.db()).unwrap();
    assert!(!String::from_utf8_lossy(&raw).contains(PASSWORD));
}
