//! Contract Invariant Tests
//!
//! These tests verify the guarantees callers depend on when deciding
//! whether to send a notification.

use notify_template_core::{
    Context, EngineError, Engine, EntityKind, EvaluationEvent, NotificationPipeline,
    NotificationTemplate, PipelineError, RenderOutcome, RenderRequest, RenderStatus,
    ResolutionError, TemplateRegistry,
};
use serde_json::{json, Value};

fn ctx(value: Value) -> Context {
    Context::try_from(value).unwrap()
}

fn start(template: &str, context: Value) -> RenderOutcome {
    Engine::new(template, ctx(context), None, None).start()
}

fn create_test_template(id: &str, body: &str) -> NotificationTemplate {
    NotificationTemplate {
        id: id.to_string(),
        name: "Cambio de estado".to_string(),
        description: "Aviso al cliente cuando cambia el estado del ticket".to_string(),
        event: Some(EvaluationEvent::Modification),
        entity: Some(EntityKind::Ticket),
        body: body.to_string(),
        template_version: "1.0.0".to_string(),
        engine_min_version: "1.0.0".to_string(),
        deprecated: false,
        superseded_by: None,
    }
}

fn create_pipeline() -> NotificationPipeline {
    let mut registry = TemplateRegistry::new();
    registry.register(create_test_template(
        "estado-ticket",
        "[SI {{ticket.estado}} CAMBIÓ A 'CERRADO']Hola {{cliente.nombre}}, su ticket fue cerrado.[FIN]\
         [SINO PERO {{ticket.estado}} ES IGUAL QUE 'ABIERTO']Su ticket sigue abierto.[FIN]",
    ));
    NotificationPipeline::new(registry)
}

#[test]
fn invariant_base_block_always_wins() {
    let template = "[SI {{ticket.estado}} ES IGUAL QUE 'ABIERTO']si[FIN]\
                    [BASE]base {{ticket.estado}}[FIN]\
                    [SINO]sino[FIN]";

    for estado in ["ABIERTO", "CERRADO", ""] {
        let outcome = start(template, json!({"ticket": {"estado": estado}}));
        assert_eq!(outcome, RenderOutcome::Rendered(format!("base {estado}")));
    }
}

#[test]
fn invariant_first_matching_sino_pero_wins() {
    let template = "[SI {{ticket.p}} ES IGUAL QUE 0]cero[FIN]\
                    [SINO PERO {{ticket.p}} ES IGUAL QUE 1]primero[FIN]\
                    [SINO PERO {{ticket.p}} ES IGUAL QUE 2]segundo[FIN]\
                    [SINO PERO {{ticket.p}} ES DIFERENTE DE 0]tercero[FIN]";

    // second and third are both true
    let outcome = start(template, json!({"ticket": {"p": 2}}));
    assert_eq!(outcome.rendered(), Some("segundo"));
}

#[test]
fn invariant_sino_is_the_fallback() {
    let template = "[SI {{ticket.p}} ES IGUAL QUE 1]uno[FIN]\
                    [SINO PERO {{ticket.p}} ES IGUAL QUE 2]dos[FIN]\
                    [SINO]ninguno[FIN]";

    let outcome = start(template, json!({"ticket": {"p": 9}}));
    assert_eq!(outcome, RenderOutcome::Rendered("ninguno".into()));
}

#[test]
fn invariant_no_match_is_not_failure() {
    let template = "[SI {{ticket.p}} ES IGUAL QUE 1]uno[FIN][SINO PERO {{ticket.p}} ES IGUAL QUE 2]dos[FIN]";

    let outcome = start(template, json!({"ticket": {"p": 9}}));
    assert_eq!(outcome, RenderOutcome::NoMatch);
    assert!(!outcome.is_failure());
}

#[test]
fn invariant_unknown_root_fails() {
    let outcome = start("[BASE]Hola {{desconocido.campo}}[FIN]", json!({}));
    assert_eq!(
        outcome,
        RenderOutcome::Failed(EngineError::Resolution(ResolutionError::UnknownRoot(
            "desconocido".into()
        )))
    );

    let in_condition = start(
        "[SI {{desconocido.campo}} ES IGUAL QUE 1]x[FIN][SINO]y[FIN]",
        json!({}),
    );
    assert!(in_condition.is_failure());
}

#[test]
fn invariant_no_partial_output_on_failure() {
    let outcome = start(
        "[BASE]Hola {{cliente.nombre}}, {{cliente.apellido}}[FIN]",
        json!({"cliente": {"nombre": "Ana"}}),
    );
    assert!(outcome.is_failure());
    assert_eq!(outcome.rendered(), None);
}

#[test]
fn invariant_connectives_fold_left_to_right() {
    // [false, O true, Y false] => (false OR true) AND false
    let template = "[SI {{ticket.a}} ES IGUAL QUE 1 O {{ticket.b}} ES IGUAL QUE 1 Y {{ticket.c}} ES IGUAL QUE 1]si[FIN][SINO]no[FIN]";
    let outcome = start(template, json!({"ticket": {"a": 0, "b": 1, "c": 0}}));
    assert_eq!(outcome.rendered(), Some("no"));

    // [true, O true, Y false] is still false: no AND-before-OR precedence
    let outcome = start(template, json!({"ticket": {"a": 1, "b": 1, "c": 0}}));
    assert_eq!(outcome.rendered(), Some("no"));
}

#[test]
fn invariant_change_detection_requires_ticket_modification() {
    let template = "[SI {{ticket.estado}} CAMBIÓ A 'CERRADO']cambio[FIN][SINO]igual[FIN]";
    let context = json!({
        "ticket": {"estado": "CERRADO"},
        "previamente": {"ticket": {"estado": "ABIERTO"}}
    });

    for (event, entity) in [
        (None, None),
        (Some(EvaluationEvent::Creation), Some(EntityKind::Ticket)),
        (Some(EvaluationEvent::Elimination), Some(EntityKind::Ticket)),
        (Some(EvaluationEvent::Modification), None),
    ] {
        let outcome = Engine::new(template, ctx(context.clone()), event, entity).start();
        assert_eq!(outcome.rendered(), Some("igual"));
    }

    let outcome = Engine::new(
        template,
        ctx(context),
        Some(EvaluationEvent::Modification),
        Some(EntityKind::Ticket),
    )
    .start();
    assert_eq!(outcome.rendered(), Some("cambio"));
}

#[test]
fn invariant_changed_to_checks_every_previous_field() {
    // The new value appears in an unrelated field of the previous
    // snapshot, so the change is not reported.
    let template = "[SI {{ticket.estado}} CAMBIÓ A 'CERRADO']cambio[FIN][SINO]igual[FIN]";
    let context = json!({
        "ticket": {"estado": "CERRADO"},
        "previamente": {"ticket": {"estado": "ABIERTO", "ultimo_estado_cliente": "CERRADO"}}
    });

    let outcome = Engine::new(
        template,
        ctx(context),
        Some(EvaluationEvent::Modification),
        Some(EntityKind::Ticket),
    )
    .start();
    assert_eq!(outcome.rendered(), Some("igual"));
}

#[test]
fn scenario_base_greeting() {
    let outcome = start("[BASE]Hola {{cliente.nombre}}[FIN]", json!({"cliente": {"nombre": "Ana"}}));
    assert_eq!(outcome, RenderOutcome::Rendered("Hola Ana".into()));
}

#[test]
fn scenario_si_false_renders_sino() {
    let outcome = start(
        "[SI {{ticket.estado}} ES IGUAL QUE 'ABIERTO']Activo[FIN][SINO]Inactivo[FIN]",
        json!({"ticket": {"estado": "CERRADO"}}),
    );
    assert_eq!(outcome, RenderOutcome::Rendered("Inactivo".into()));
}

#[test]
fn scenario_lone_false_si_is_no_match() {
    let outcome = start(
        "[SI {{ticket.estado}} ES IGUAL QUE 'ABIERTO']Activo[FIN]",
        json!({"ticket": {"estado": "CERRADO"}}),
    );
    assert_eq!(outcome, RenderOutcome::NoMatch);
}

#[test]
fn scenario_previous_snapshot_without_event() {
    let outcome = start(
        "[SI {{previamente.ticket.estado}} CAMBIÓ A 'ABIERTO']reabierto[FIN]",
        json!({"ticket": {"estado": "ABIERTO"}}),
    );
    assert_eq!(outcome, RenderOutcome::NoMatch);
}

#[test]
fn invariant_engines_render_in_parallel() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Engine::new(
                "[SI {{ticket.p}} ES IGUAL QUE 0]par[FIN][SINO]impar {{ticket.p}}[FIN]",
                ctx(json!({"ticket": {"p": i % 2}})),
                None,
                None,
            );
            std::thread::spawn(move || engine.start())
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let expected = if i % 2 == 0 { "par" } else { "impar 1" };
        assert_eq!(handle.join().unwrap().rendered(), Some(expected));
    }
}

#[test]
fn pipeline_renders_catalogue_template() {
    let pipeline = create_pipeline();
    let request = RenderRequest {
        context: ctx(json!({
            "cliente": {"nombre": "Ana"},
            "ticket": {"estado": "CERRADO"},
            "previamente": {"ticket": {"estado": "ABIERTO"}}
        })),
        // event and entity come from the template binding
        event: None,
        entity: None,
    };

    let message = pipeline.render("estado-ticket", &request).unwrap();
    assert_eq!(message.status, RenderStatus::Rendered);
    assert_eq!(message.body.as_deref(), Some("Hola Ana, su ticket fue cerrado."));
    assert_eq!(message.template_id.as_deref(), Some("estado-ticket"));
    assert!(!message.id.is_empty());
}

#[test]
fn pipeline_request_event_overrides_template_binding() {
    let pipeline = create_pipeline();
    let request = RenderRequest {
        context: ctx(json!({
            "cliente": {"nombre": "Ana"},
            "ticket": {"estado": "CERRADO"},
            "previamente": {"ticket": {"estado": "ABIERTO"}}
        })),
        event: Some(EvaluationEvent::Creation),
        entity: None,
    };

    let message = pipeline.render("estado-ticket", &request).unwrap();
    assert_eq!(message.status, RenderStatus::NoMatch);
    assert_eq!(message.body, None);
    assert_eq!(message.error, None);
}

#[test]
fn pipeline_records_render_failure() {
    let pipeline = create_pipeline();
    let request = RenderRequest {
        context: ctx(json!({"ticket": {"estado": "CERRADO"}})),
        event: None,
        entity: None,
    };

    // no previous snapshot for the change comparator
    let message = pipeline.render("estado-ticket", &request).unwrap();
    assert_eq!(message.status, RenderStatus::Failed);
    assert!(message.error.is_some());
    assert!(message.body.is_none());
}

#[test]
fn pipeline_template_not_found_error() {
    let pipeline = create_pipeline();
    let result = pipeline.render("nonexistent", &RenderRequest::default());
    assert!(matches!(result, Err(PipelineError::TemplateNotFound(_))));
}

#[test]
fn pipeline_rejects_newer_engine_requirement() {
    let mut template = create_test_template("futuro", "[BASE]x[FIN]");
    template.engine_min_version = "99.0.0".to_string();
    let mut registry = TemplateRegistry::new();
    registry.register(template);
    let pipeline = NotificationPipeline::new(registry);

    let result = pipeline.render("futuro", &RenderRequest::default());
    assert!(matches!(result, Err(PipelineError::EngineVersionMismatch(..))));
}

#[test]
fn pipeline_renders_ad_hoc_text() {
    let pipeline = NotificationPipeline::default();
    let request = RenderRequest {
        context: ctx(json!({"usuario": {"nombre": "Luis"}})),
        event: None,
        entity: None,
    };

    let message = pipeline.render_text("[BASE]Atendido por {{usuario.nombre}}[FIN]", &request);
    assert_eq!(message.status, RenderStatus::Rendered);
    assert_eq!(message.body.as_deref(), Some("Atendido por Luis"));
    assert_eq!(message.template_id, None);

    let json = serde_json::to_value(&message).unwrap();
    assert_eq!(json["status"], "rendered");
    assert!(json.get("error").is_none());
}
