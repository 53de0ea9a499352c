//! End-to-end conversation flows against scripted providers.

use std::sync::Arc;
use std::time::Duration;

use kabot_agent::test_helpers::{sample_vehicles, SequentialMockProvider};
use kabot_agent::{CatalogSearch, ClosureOutcome, Collaborators, LlmGateway, Orchestrator};
use kabot_config::{MemoryConfig, OrchestratorConfig};
use kabot_core::memory::MemoryTier;
use kabot_core::message::{Message, Role, UserKey};
use kabot_core::Error;
use kabot_core::error::ProviderError;
use kabot_memory::Stores;

fn build(stores: Stores, replies: &[&str]) -> (Arc<Orchestrator>, Arc<SequentialMockProvider>) {
    build_scripted(stores, replies.iter().map(|r| Ok(r.to_string())).collect())
}

fn build_scripted(
    stores: Stores,
    script: Vec<Result<String, ProviderError>>,
) -> (Arc<Orchestrator>, Arc<SequentialMockProvider>) {
    let provider = Arc::new(SequentialMockProvider::new(script));
    let gateway = LlmGateway::new(provider.clone(), "mock-model");
    let collaborators = Collaborators::prompt_backed(
        gateway.clone(),
        Arc::new(CatalogSearch::new(sample_vehicles())),
    );
    let orchestrator = Orchestrator::new(gateway, stores, collaborators, &OrchestratorConfig::default());
    (Arc::new(orchestrator), provider)
}

fn in_memory() -> Stores {
    Stores::in_memory(&MemoryConfig::default(), Duration::from_secs(2))
}

#[tokio::test]
async fn hola_on_a_fresh_user() {
    let (orch, provider) = build(
        in_memory(),
        &[r#"{"intention":"none","response":"¡Hola! ¿Buscas algún auto en particular?"}"#],
    );
    let user = UserKey::from("5215512345678");

    let reply = orch.handle_message(&user, "Hola").await.unwrap();
    assert_eq!(reply, "¡Hola! ¿Buscas algún auto en particular?");

    let working = orch.stores().working.load(&user).await.unwrap().unwrap();
    assert_eq!(
        working,
        vec![
            Message::user("Hola"),
            Message::assistant("¡Hola! ¿Buscas algún auto en particular?"),
        ]
    );

    // The classifier saw empty memory views
    let context = &provider.request(0).unwrap().messages[1].content;
    assert!(context.contains("<fact_memory></fact_memory>"));
    assert!(context.contains("<summary_memory></summary_memory>"));
    assert!(context.contains("<working_memory></working_memory>"));
}

#[tokio::test]
async fn exit_after_one_exchange_consolidates_memory() {
    let (orch, provider) = build(
        in_memory(),
        &[
            r#"{"intention":"none","response":"¡Hola Ana! ¿Qué auto buscas?"}"#,
            r#"{"intention":"exit"}"#,
            "¡Fue un gusto ayudarte, Ana!",
            "Ana saludó y se despidió sin buscar un auto.",
            r#"{"nombre": "Ana"}"#,
        ],
    );
    let user = UserKey::from("u-exit");

    orch.handle_message(&user, "Hola, soy Ana").await.unwrap();
    let farewell = orch.handle_message(&user, "Gracias, hasta luego").await.unwrap();
    assert_eq!(farewell, "¡Fue un gusto ayudarte, Ana!");

    let stores = orch.stores();
    assert!(stores.working.load(&user).await.unwrap().is_none());

    let history = stores.episodic.load(&user).await.unwrap().unwrap();
    let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        [
            "Hola, soy Ana",
            "¡Hola Ana! ¿Qué auto buscas?",
            "Gracias, hasta luego",
            "¡Fue un gusto ayudarte, Ana!",
        ]
    );
    assert_eq!(
        stores.summary.load(&user).await.unwrap().as_deref(),
        Some("Ana saludó y se despidió sin buscar un auto.")
    );
    assert_eq!(stores.facts.load(&user).await.unwrap().unwrap()["nombre"], "Ana");
    assert_eq!(provider.call_count(), 5);

    // The farewell writer saw the prior exchange
    let farewell_prompt = &provider.request(2).unwrap().messages[0].content;
    assert!(farewell_prompt.contains("<user>Hola, soy Ana</user>"));
}

#[tokio::test]
async fn next_conversation_is_seeded_from_consolidated_memory() {
    let (orch, provider) = build(
        in_memory(),
        &[
            r#"{"intention":"exit"}"#,
            "¡Hasta pronto!",
            "El usuario prefiere SUVs.",
            r#"{"tipo_preferido": "SUV"}"#,
            r#"{"intention":"none","response":"¡Hola! ¿Seguimos con las SUVs?"}"#,
        ],
    );
    let user = UserKey::from("u-return");

    orch.handle_message(&user, "Me gustan las SUV, adiós").await.unwrap();
    let reply = orch.handle_message(&user, "Hola de nuevo").await.unwrap();
    assert_eq!(reply, "¡Hola! ¿Seguimos con las SUVs?");

    let context = &provider.request(4).unwrap().messages[1].content;
    assert!(context.contains("<fact_memory>tipo_preferido: SUV</fact_memory>"));
    assert!(context.contains("<summary_memory>El usuario prefiere SUVs.</summary_memory>"));

    let working = orch.stores().working.load(&user).await.unwrap().unwrap();
    assert_eq!(working.len(), 5);
    assert!(working[..3].iter().all(|m| m.role == Role::System));
}

#[tokio::test]
async fn classifier_fallback_answers_with_raw_text() {
    let (orch, _) = build(in_memory(), &["hello"]);
    let user = UserKey::from("u-fallback");

    let reply = orch.handle_message(&user, "hi").await.unwrap();
    assert_eq!(reply, "hello");
    assert_eq!(
        orch.stores().working.load(&user).await.unwrap().unwrap(),
        vec![Message::user("hi"), Message::assistant("hello")]
    );
}

#[tokio::test]
async fn working_memory_only_grows_until_closure() {
    let (orch, _) = build(
        in_memory(),
        &[
            r#"{"intention":"none","response":"uno"}"#,
            r#"{"intention":"search"}"#,
            "Tengo un Mazda 3 2021 para ti.",
            r#"{"intention":"kavak_info"}"#,
            "Kavak da 3 meses de garantía.",
            r#"{"intention":"episodic_memory"}"#,
            "No recuerdo conversaciones anteriores.",
        ],
    );
    let user = UserKey::from("u-grow");
    let mut previous: Vec<Message> = Vec::new();

    for input in ["Hola", "Busco un Mazda", "¿Tienen garantía?", "¿Qué vi la vez pasada?"] {
        orch.handle_message(&user, input).await.unwrap();
        let current = orch.stores().working.load(&user).await.unwrap().unwrap_or_default();
        assert!(current.len() >= previous.len());
        assert_eq!(&current[..previous.len()], previous.as_slice());
        previous = current;
    }
    // none 2 + search 3 + kavak_info 2 + episodic 0
    assert_eq!(previous.len(), 7);
}

#[tokio::test]
async fn failed_turn_leaves_working_memory_untouched() {
    let (orch, _) = build(
        in_memory(),
        &[r#"{"intention":"financing"}"#],
    );
    let user = UserKey::from("u-fail");
    orch.stores()
        .working
        .store(&user, vec![Message::user("Hola"), Message::assistant("¡Hola!")])
        .await
        .unwrap();

    // Financing collaborator has no scripted reply left
    let err = orch.handle_message(&user, "¿Cuánto al mes?").await.unwrap_err();
    assert!(matches!(err, Error::Provider(_)));
    assert_eq!(orch.stores().working.load(&user).await.unwrap().unwrap().len(), 2);
}

#[tokio::test]
async fn failed_closure_on_exit_still_says_goodbye() {
    let (orch, provider) = build_scripted(
        in_memory(),
        vec![
            Ok(r#"{"intention":"exit"}"#.into()),
            Ok("¡Hasta pronto, Ana!".into()),
            Err(ProviderError::Network("connection reset".into())),
            Ok("Ana se despidió.".into()),
            Ok(r#"{"nombre": "Ana"}"#.into()),
        ],
    );
    let user = UserKey::from("u-exit-fail");
    let stores = orch.stores();
    stores
        .working
        .store(&user, vec![Message::user("Soy Ana"), Message::assistant("¡Hola Ana!")])
        .await
        .unwrap();

    let reply = orch.reply(&user, "adiós").await;
    assert_eq!(reply, "¡Hasta pronto, Ana!");
    assert_eq!(provider.call_count(), 3);

    // The farewell stays in working memory and nothing reached the durable tiers
    assert_eq!(stores.working.load(&user).await.unwrap().unwrap().len(), 4);
    assert!(stores.episodic.load(&user).await.unwrap().is_none());
    assert!(stores.summary.load(&user).await.unwrap().is_none());

    // A later close consolidates each message exactly once
    assert_eq!(
        orch.close(&user).await.unwrap(),
        ClosureOutcome::Consolidated { messages: 4 }
    );
    let history = orch.expand_context(&user).await.unwrap();
    let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["Soy Ana", "¡Hola Ana!", "adiós", "¡Hasta pronto, Ana!"]);
    assert!(stores.working.load(&user).await.unwrap().is_none());
}

#[tokio::test]
async fn closing_twice_is_harmless() {
    let (orch, _) = build(in_memory(), &["Resumen.", "{}"]);
    let user = UserKey::from("u-twice");
    orch.stores()
        .working
        .store(&user, vec![Message::user("Hola")])
        .await
        .unwrap();

    assert_eq!(
        orch.close(&user).await.unwrap(),
        ClosureOutcome::Consolidated { messages: 1 }
    );
    assert_eq!(orch.close(&user).await.unwrap(), ClosureOutcome::NothingToClose);
    assert_eq!(orch.expand_context(&user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_turns_for_one_user_do_not_lose_messages() {
    let (orch, _) = build(
        in_memory(),
        &[
            r#"{"intention":"none","response":"primera"}"#,
            r#"{"intention":"none","response":"segunda"}"#,
        ],
    );
    let user = UserKey::from("u-race");

    let a = tokio::spawn({
        let orch = orch.clone();
        let user = user.clone();
        async move { orch.handle_message(&user, "A").await }
    });
    let b = tokio::spawn({
        let orch = orch.clone();
        let user = user.clone();
        async move { orch.handle_message(&user, "B").await }
    });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let working = orch.stores().working.load(&user).await.unwrap().unwrap();
    assert_eq!(working.len(), 4);
    let roles: Vec<_> = working.iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::User, Role::Assistant, Role::User, Role::Assistant]);
}

#[tokio::test]
async fn sqlite_backed_conversation_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = MemoryConfig {
        database_path: Some(dir.path().join("memory.sqlite").display().to_string()),
        ..MemoryConfig::default()
    };
    let user = UserKey::from("u-sqlite");

    {
        let stores = Stores::from_config(&config, Duration::from_secs(5)).await.unwrap();
        let (orch, _) = build(
            stores,
            &[
                r#"{"intention":"exit"}"#,
                "¡Hasta luego!",
                "El usuario se despidió.",
                r#"{"saludo": "formal"}"#,
            ],
        );
        orch.handle_message(&user, "Adiós").await.unwrap();
    }

    let stores = Stores::from_config(&config, Duration::from_secs(5)).await.unwrap();
    assert_eq!(stores.episodic.load(&user).await.unwrap().unwrap().len(), 2);
    assert_eq!(
        stores.summary.load(&user).await.unwrap().as_deref(),
        Some("El usuario se despidió.")
    );
    assert!(stores.working.load(&user).await.unwrap().is_none());
}
