use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use std::fs;
mod test_env;

fn setup_test_env() -> (TempDir, std::sync::MutexGuard<'static, ()>) {
    let guard = test_env::lock_test_env();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let config_dir = temp_dir.path().join(".charla");
    fs::create_dir_all(&config_dir).unwrap();
    let config_file = config_dir.join("rc");
    fs::write(&config_file, format!("data.location={}\n", db_path.display())).unwrap();
    std::env::set_var("HOME", temp_dir.path().to_str().unwrap());
    (temp_dir, guard)
}

fn charla() -> Command {
    Command::cargo_bin("charla").unwrap()
}

#[test]
fn test_invalid_stage_code_rejected() {
    let (temp_dir, _guard) = setup_test_env();

    charla()
        .args(["stages", "add", "Bienvenida", "--code", "con espacios"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid stage code"));
    drop(temp_dir); // Keep temp_dir alive until end
}

#[test]
fn test_empty_stage_name_rejected() {
    let (temp_dir, _guard) = setup_test_env();

    charla()
        .args(["stages", "add", "   ", "--code", "bienvenida"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Stage name cannot be empty"));
    drop(temp_dir);
}

#[test]
fn test_modify_unknown_stage_suggests_near_code() {
    let (temp_dir, _guard) = setup_test_env();

    charla()
        .args(["stages", "add", "Precios", "--code", "precio_asesorias"])
        .assert()
        .success();

    charla()
        .args(["stages", "modify", "precio_asesoria", "--sequence", "5"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Did you mean 'precio_asesorias'?"));
    drop(temp_dir);
}

#[test]
fn test_bad_var_assignment_rejected() {
    let (temp_dir, _guard) = setup_test_env();

    charla()
        .args(["stages", "add", "Bienvenida", "--code", "bienvenida"])
        .assert()
        .success();

    charla()
        .args(["resolve", "bienvenida", "--var", "nombre"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Expected key=value"));

    charla()
        .args(["resolve", "bienvenida", "--var", "1nombre=Ana"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid variable key"));
    drop(temp_dir);
}

#[test]
fn test_template_id_must_be_numeric() {
    let (temp_dir, _guard) = setup_test_env();

    charla()
        .args(["templates", "show", "abc"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Template ID must be a number"));

    charla()
        .args(["templates", "deactivate", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("must be positive"));
    drop(temp_dir);
}

#[test]
fn test_show_unknown_template_fails() {
    let (temp_dir, _guard) = setup_test_env();

    charla()
        .args(["templates", "show", "42"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No template with id 42"));
    drop(temp_dir);
}

#[test]
fn test_deactivate_unknown_stage_fails() {
    let (temp_dir, _guard) = setup_test_env();

    charla()
        .args(["stages", "deactivate", "nada"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No active stage with code 'nada'"));
    drop(temp_dir);
}

#[test]
fn test_unknown_next_stage_rejected_at_save() {
    let (temp_dir, _guard) = setup_test_env();

    charla()
        .args(["stages", "add", "Bienvenida", "--code", "bienvenida", "--next", "despedida"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No active stage with code 'despedida'"));
    drop(temp_dir);
}
