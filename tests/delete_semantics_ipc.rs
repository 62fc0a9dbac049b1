mod test_support;

use serde_json::json;
use test_support::{code_of, id_of, seed_enrollment, Sidecar};

#[test]
fn referenced_rows_cannot_be_deleted() {
    let (mut s, workspace) = Sidecar::with_workspace("linguistika-delete-restrict");
    let seed = seed_enrollment(&mut s, "Ana García", "Inglés B1", "Lucía");

    for (method, id) in [
        ("tutores.delete", seed.tutor_id),
        ("cursos.delete", seed.curso_id),
        ("estudiantes.delete", seed.estudiante_id),
    ] {
        let e = s.fail(method, json!({ "id": id }));
        assert_eq!(code_of(&e), "in_use", "{method}");
        assert_eq!(e["details"]["count"], 1, "{method}");
        assert_eq!(e["details"]["retryable"], false);
    }
    assert_eq!(
        s.ok("tutores.list", json!({}))["tutores"].as_array().map(|a| a.len()),
        Some(1)
    );

    s.ok("matriculas.delete", json!({ "id": seed.matricula_id }));
    s.ok("cursos.delete", json!({ "id": seed.curso_id }));
    s.ok("estudiantes.delete", json!({ "id": seed.estudiante_id }));
    s.ok("tutores.delete", json!({ "id": seed.tutor_id }));

    drop(s);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn tutor_with_payments_only_is_still_in_use() {
    let (mut s, workspace) = Sidecar::with_workspace("linguistika-delete-payments");
    let tutor_id = id_of(
        &s.ok(
            "tutores.create",
            json!({ "input": { "nombre": "Marc Puig", "tarifa_por_hora": 18.0 } }),
        ),
        "tutor",
    );
    s.ok(
        "pagos.create",
        json!({ "input": { "tutor_id": tutor_id, "monto": 36.0 } }),
    );

    let e = s.fail("tutores.delete", json!({ "id": tutor_id }));
    assert_eq!(code_of(&e), "in_use");
    assert_eq!(e["details"]["dependents"], "pagos");

    drop(s);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn deleting_an_enrollment_removes_its_sessions_and_keeps_payments() {
    let (mut s, workspace) = Sidecar::with_workspace("linguistika-delete-cascade");
    let seed = seed_enrollment(&mut s, "Ana García", "Inglés B1", "Lucía");
    let other = seed_enrollment(&mut s, "Marc Puig", "Francés A2", "Tomás");

    let mut clase_ids = Vec::new();
    for (m, hora) in [
        (seed.matricula_id, "09:00"),
        (seed.matricula_id, "11:00"),
        (other.matricula_id, "12:00"),
    ] {
        let hora_fin = format!("{}:30", &hora[..2]);
        clase_ids.push(id_of(
            &s.ok(
                "clases.create",
                json!({ "input": {
                    "matricula_id": m,
                    "fecha": "2026-10-20",
                    "hora_inicio": hora,
                    "hora_fin": hora_fin
                } }),
            ),
            "clase",
        ));
    }
    let pago_id = id_of(
        &s.ok(
            "pagos.create",
            json!({ "input": {
                "tutor_id": seed.tutor_id,
                "clase_id": clase_ids[0],
                "cantidad_clases": 1,
                "monto": 20.0
            } }),
        ),
        "pago",
    );

    s.ok("matriculas.delete", json!({ "id": seed.matricula_id }));

    let clases = s.ok("clases.list", json!({}));
    let remaining: Vec<i64> = clases["clases"]
        .as_array()
        .expect("clases array")
        .iter()
        .filter_map(|c| c["id"].as_i64())
        .collect();
    assert_eq!(remaining, vec![clase_ids[2]]);

    let pago = s.ok("pagos.get", json!({ "id": pago_id }));
    assert!(pago["pago"]["clase_id"].is_null());
    assert_eq!(pago["pago"]["monto"], 20.0);

    let e = s.fail("clases.get", json!({ "id": clase_ids[0] }));
    assert_eq!(code_of(&e), "not_found");

    drop(s);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn deleting_a_session_detaches_its_payment() {
    let (mut s, workspace) = Sidecar::with_workspace("linguistika-delete-session");
    let seed = seed_enrollment(&mut s, "Ana García", "Inglés B1", "Lucía");
    let clase_id = id_of(
        &s.ok(
            "clases.create",
            json!({ "input": {
                "matricula_id": seed.matricula_id,
                "fecha": "2026-10-21",
                "hora_inicio": "17:00",
                "hora_fin": "18:00"
            } }),
        ),
        "clase",
    );
    let pago_id = id_of(
        &s.ok(
            "pagos.create",
            json!({ "input": { "tutor_id": seed.tutor_id, "clase_id": clase_id, "monto": 20.0 } }),
        ),
        "pago",
    );

    s.ok("clases.delete", json!({ "id": clase_id }));
    let pago = s.ok("pagos.get", json!({ "id": pago_id }));
    assert!(pago["pago"]["clase_id"].is_null());

    drop(s);
    let _ = std::fs::remove_dir_all(workspace);
}
