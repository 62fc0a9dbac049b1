mod test_support;

use serde_json::json;
use test_support::{code_of, id_of, seed_enrollment, Sidecar};

#[test]
fn tutor_lifecycle_over_ipc() {
    let (mut s, workspace) = Sidecar::with_workspace("linguistika-tutor-lifecycle");

    let created = s.ok(
        "tutores.create",
        json!({ "input": {
            "nombre": "Ana García",
            "email": "ana@x.com",
            "especialidad": "Inglés",
            "tarifa_por_hora": 20.0,
            "estado": 1
        } }),
    );
    let id = id_of(&created, "tutor");
    assert!(id > 0);
    assert!(created["tutor"].get("created_at").is_some());

    let listed = s.ok("tutores.list", json!({}));
    let rows = listed["tutores"].as_array().expect("tutores array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["nombre"], "Ana García");
    assert_eq!(rows[0]["tarifa_por_hora"], 20.0);

    let updated = s.ok(
        "tutores.update",
        json!({ "id": id, "patch": { "tarifa_por_hora": 25.0 } }),
    );
    assert_eq!(updated["tutor"]["tarifa_por_hora"], 25.0);
    assert_eq!(updated["tutor"]["email"], "ana@x.com");

    let got = s.ok("tutores.get", json!({ "id": id }));
    assert_eq!(got["tutor"]["tarifa_por_hora"], 25.0);

    let deleted = s.ok("tutores.delete", json!({ "id": id }));
    assert_eq!(deleted["deleted"], id);
    let listed = s.ok("tutores.list", json!({}));
    assert_eq!(listed["tutores"].as_array().map(|a| a.len()), Some(0));

    let again = s.fail("tutores.delete", json!({ "id": id }));
    assert_eq!(code_of(&again), "not_found");
    assert_eq!(again["details"]["retryable"], false);
    assert_eq!(again["details"]["id"], id);

    drop(s);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn invariant_violations_are_reported_per_field() {
    let (mut s, workspace) = Sidecar::with_workspace("linguistika-invariants");

    let e = s.fail("cursos.create", json!({ "input": { "nombre": "Inglés A1", "max_estudiantes": 0 } }));
    assert_eq!(code_of(&e), "validation_failed");
    assert_eq!(e["details"]["field"], "max_estudiantes");

    let e = s.fail("tutores.create", json!({ "input": { "nombre": "   " } }));
    assert_eq!(code_of(&e), "validation_failed");
    assert_eq!(e["details"]["field"], "nombre");

    let seed = seed_enrollment(&mut s, "Marc Puig", "Francés A2", "Tomás");
    let e = s.fail(
        "pagos.create",
        json!({ "input": { "tutor_id": seed.tutor_id, "monto": -5.0 } }),
    );
    assert_eq!(code_of(&e), "validation_failed");
    assert_eq!(e["details"]["field"], "monto");

    let e = s.fail(
        "clases.create",
        json!({ "input": {
            "matricula_id": seed.matricula_id,
            "fecha": "2026-10-20",
            "hora_inicio": "11:00",
            "hora_fin": "10:00"
        } }),
    );
    assert_eq!(code_of(&e), "validation_failed");
    assert_eq!(e["details"]["field"], "hora_fin");

    let e = s.fail(
        "matriculas.create",
        json!({ "input": {
            "estudiante_id": 9999,
            "curso_id": seed.curso_id,
            "tutor_id": seed.tutor_id
        } }),
    );
    assert_eq!(code_of(&e), "referential");
    assert_eq!(e["details"]["field"], "estudiante_id");

    let e = s.fail("cursos.create", json!({ "input": { "nombre": "X", "nivel": "D1" } }));
    assert_eq!(code_of(&e), "bad_params");

    drop(s);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn joined_names_track_the_referenced_rows() {
    let (mut s, workspace) = Sidecar::with_workspace("linguistika-joins");
    let seed = seed_enrollment(&mut s, "Ana García", "Inglés B1", "Lucía");

    let m = s.ok("matriculas.get", json!({ "id": seed.matricula_id }));
    assert_eq!(m["matricula"]["estudiante_nombre"], "Lucía");
    assert_eq!(m["matricula"]["curso_nombre"], "Inglés B1");
    assert_eq!(m["matricula"]["tutor_nombre"], "Ana García");

    s.ok(
        "estudiantes.update",
        json!({ "id": seed.estudiante_id, "patch": { "nombre": "Lucía Ferrer" } }),
    );
    let m = s.ok("matriculas.get", json!({ "id": seed.matricula_id }));
    assert_eq!(m["matricula"]["estudiante_nombre"], "Lucía Ferrer");

    let clase = s.ok(
        "clases.create",
        json!({ "input": {
            "matricula_id": seed.matricula_id,
            "fecha": "2026-10-20",
            "hora_inicio": "09:00",
            "hora_fin": "10:30"
        } }),
    );
    assert_eq!(clase["clase"]["tutor_id"], seed.tutor_id);
    assert_eq!(clase["clase"]["hora_fin"], "10:30");
    assert_eq!(clase["clase"]["estado"], "programada");

    drop(s);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn session_state_only_moves_forward() {
    let (mut s, workspace) = Sidecar::with_workspace("linguistika-session-state");
    let seed = seed_enrollment(&mut s, "Ana García", "Inglés B1", "Lucía");
    let clase_id = id_of(
        &s.ok(
            "clases.create",
            json!({ "input": {
                "matricula_id": seed.matricula_id,
                "fecha": "2026-10-20",
                "hora_inicio": "09:00",
                "hora_fin": "10:00"
            } }),
        ),
        "clase",
    );

    s.ok("clases.update", json!({ "id": clase_id, "patch": { "estado": "completada" } }));
    let e = s.fail(
        "clases.update",
        json!({ "id": clase_id, "patch": { "estado": "programada" } }),
    );
    assert_eq!(code_of(&e), "validation_failed");
    assert_eq!(e["details"]["field"], "estado");

    drop(s);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn payments_list_filters_by_tutor_and_totals() {
    let (mut s, workspace) = Sidecar::with_workspace("linguistika-payments");
    let ana = seed_enrollment(&mut s, "Ana García", "Inglés B1", "Lucía");
    let marc = seed_enrollment(&mut s, "Marc Puig", "Francés A2", "Tomás");

    for (tutor_id, monto) in [(ana.tutor_id, 40.0), (marc.tutor_id, 25.5), (ana.tutor_id, 10.0)] {
        s.ok(
            "pagos.create",
            json!({ "input": { "tutor_id": tutor_id, "monto": monto, "fecha_pago": "2026-10-01" } }),
        );
    }

    let all = s.ok("pagos.list", json!({}));
    assert_eq!(all["pagos"].as_array().map(|a| a.len()), Some(3));
    assert_eq!(all["total"], 75.5);

    let only_ana = s.ok("pagos.list", json!({ "tutorId": ana.tutor_id }));
    assert_eq!(only_ana["pagos"].as_array().map(|a| a.len()), Some(2));
    assert_eq!(only_ana["total"], 50.0);
    assert_eq!(only_ana["pagos"][0]["tutor_nombre"], "Ana García");

    let e = s.fail("pagos.list", json!({ "tutorId": "ana" }));
    assert_eq!(code_of(&e), "bad_params");

    drop(s);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn session_times_travel_as_whole_minutes() {
    let (mut s, workspace) = Sidecar::with_workspace("linguistika-session-minutes");
    let seed = seed_enrollment(&mut s, "Marc Puig", "Francés A2", "Tomás");

    let e = s.fail(
        "clases.create",
        json!({ "input": {
            "matricula_id": seed.matricula_id,
            "fecha": "2026-10-20",
            "hora_inicio": "09:00:10",
            "hora_fin": "09:00:40"
        } }),
    );
    assert_eq!(code_of(&e), "bad_params");

    let created = s.ok(
        "clases.create",
        json!({ "input": {
            "matricula_id": seed.matricula_id,
            "fecha": "2026-10-20",
            "hora_inicio": "09:00",
            "hora_fin": "09:45"
        } }),
    );
    let id = id_of(&created, "clase");

    let updated = s.ok(
        "clases.update",
        json!({ "id": id, "patch": { "notas": "Repaso de la unidad 2" } }),
    );
    assert_eq!(updated["clase"]["hora_inicio"], "09:00");
    assert_eq!(updated["clase"]["hora_fin"], "09:45");
    assert_eq!(updated["clase"]["notas"], "Repaso de la unidad 2");

    drop(s);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn typed_text_is_trimmed_on_create_and_update() {
    let (mut s, workspace) = Sidecar::with_workspace("linguistika-trim");

    let created = s.ok(
        "tutores.create",
        json!({ "input": {
            "nombre": "Ana García ",
            "email": " ana@x.com",
            "tarifa_por_hora": 20.0
        } }),
    );
    assert_eq!(created["tutor"]["nombre"], "Ana García");
    assert_eq!(created["tutor"]["email"], "ana@x.com");

    let id = id_of(&created, "tutor");
    let updated = s.ok(
        "tutores.update",
        json!({ "id": id, "patch": { "telefono": " 600 111 222 " } }),
    );
    assert_eq!(updated["tutor"]["telefono"], "600 111 222");

    drop(s);
    let _ = std::fs::remove_dir_all(workspace);
}
