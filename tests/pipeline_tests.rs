//! Integration tests for the page translation and holiday page workflows
//!
//! These tests drive the command flows end to end against a mocked CMS and
//! language-model endpoint, with every file written to a temporary workspace.

use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use cms_page_translator::{
    cms::CmsClient,
    commands,
    config::{CmsConfig, ResumeMode, TranslationConfig, Workspace},
    language::Language,
    mapping::FlatMapping,
    rules::Rules,
    translator::{OpenAiTranslator, Translator},
};

// ==================== Test Helpers ====================

const PAGE_PATH: &str = "/cms/v3/pages/site-pages/123";

/// Uppercases everything it is given.
struct ShoutTranslator;

impl Translator for ShoutTranslator {
    async fn translate(&self, text: &str) -> anyhow::Result<String> {
        Ok(text.to_uppercase())
    }
}

fn create_cms_client(server: &MockServer) -> CmsClient {
    CmsClient::new(
        reqwest::Client::new(),
        &CmsConfig {
            api_key: "pat-test".to_string(),
            page_id: "123".to_string(),
            api_url: server.uri(),
        },
    )
}

fn create_translation_config(api_url: &str) -> TranslationConfig {
    TranslationConfig {
        openai_api_key: "test-openai-key".to_string(),
        openai_model: "gpt-4o-mini".to_string(),
        openai_api_url: api_url.to_string(),
        source_language: Language::ENGLISH,
        target_language: Language::THAI,
        file_suffix: "th".to_string(),
        success_delay: Duration::ZERO,
        failure_delay: Duration::ZERO,
        resume_mode: ResumeMode::LastKey,
        rules_file: None,
    }
}

fn create_page() -> Value {
    json!({
        "id": "123",
        "slug": "about",
        "createdAt": "2024-01-01T00:00:00Z",
        "name": "About",
        "pageTitle": "About us",
        "layoutSections": {
            "dnd_area": {
                "label": "Main",
                "rows": [{"0": {"rows": [{"0": {
                    "label": "Hero",
                    "params": {
                        "heading": "Welcome",
                        "text": "<p>Hello</p>",
                        "css": "color: red",
                        "description": "Hero banner",
                        "caption": "Lorem ipsum dolor",
                        "content_type": "hero"
                    }
                }}]}}]
            }
        }
    })
}

fn create_openai_response(content: &str) -> Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

async fn patch_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "PATCH")
        .map(|r| r.body_json::<Value>().expect("PATCH body is JSON"))
        .collect()
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

// ==================== Translation Workflow Tests ====================

#[tokio::test]
async fn test_extract_translate_update_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .and(header("Authorization", "Bearer pat-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_page()))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(PAGE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"updatedAt": "2025-01-01T00:00:00Z"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let workspace = Workspace::new(temp_dir.path());
    let cms = create_cms_client(&server);
    let rules = Rules::default();
    let config = create_translation_config("http://unused");

    // Step 1: extract
    let source = commands::extract(&cms, "123", &rules, &workspace).await.unwrap();
    assert_eq!(source.len(), 7);
    assert_eq!(source.get("root.pageTitle"), Some("About us"));
    assert!(!source.contains("root.layoutSections.dnd_area.rows[0].0.rows[0].0.params.css"));
    assert!(
        !source.contains("root.layoutSections.dnd_area.rows[0].0.rows[0].0.params.description")
    );
    assert!(workspace.source_mapping().exists());

    // Step 2: translate
    let summary = commands::translate(&ShoutTranslator, &rules, &config, &workspace)
        .await
        .unwrap();
    assert_eq!(summary.translated, 3);
    assert_eq!(summary.copied, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);

    let translated = FlatMapping::load(&workspace.translated_mapping("th")).unwrap();
    assert_eq!(translated.get("root.pageTitle"), Some("ABOUT US"));
    assert_eq!(translated.get("root.layoutSections.dnd_area.label"), Some("Main"));

    // Step 3: update
    let outcome = commands::update(&cms, "123", "th", &workspace).await.unwrap();
    assert_eq!(outcome.report.updated, 6);
    assert!(outcome.report.not_found.is_empty());
    assert!(outcome.backup.exists());
    assert_eq!(outcome.removed.len(), 2);
    assert!(!workspace.source_mapping().exists());
    assert!(!workspace.translated_mapping("th").exists());

    let bodies = patch_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let sent = &bodies[0];
    for field in ["id", "slug", "createdAt"] {
        assert!(sent.get(field).is_none(), "{} should be stripped", field);
    }
    assert_eq!(sent["pageTitle"], "ABOUT US");
    let params = &sent["layoutSections"]["dnd_area"]["rows"][0]["0"]["rows"][0]["0"]["params"];
    assert_eq!(params["heading"], "WELCOME");
    assert_eq!(params["text"], "<P>HELLO</P>");
    assert_eq!(params["description"], "Hero banner");
    assert_eq!(params["caption"], "Lorem ipsum dolor");
    assert_eq!(params["css"], "color: red");
}

#[tokio::test]
async fn test_extract_backs_up_existing_source_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_page()))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let workspace = Workspace::new(temp_dir.path());
    let mut previous = FlatMapping::new();
    previous.insert("root.pageTitle", "Edited by hand");
    previous.save(&workspace.source_mapping()).unwrap();

    commands::extract(&create_cms_client(&server), "123", &Rules::default(), &workspace)
        .await
        .unwrap();

    let files = files_in(temp_dir.path());
    assert_eq!(files.len(), 2, "{:?}", files);
    let backup = files
        .iter()
        .find(|name| name.starts_with("hubspot_translatable_content_backup_"))
        .expect("backup of the previous source mapping");
    assert!(backup.ends_with(".json"));

    let saved = FlatMapping::load(&temp_dir.path().join(backup)).unwrap();
    assert_eq!(saved.get("root.pageTitle"), Some("Edited by hand"));
    let fresh = FlatMapping::load(&workspace.source_mapping()).unwrap();
    assert_eq!(fresh.get("root.pageTitle"), Some("About us"));
}

#[tokio::test]
async fn test_update_rejected_keeps_mapping_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_page()))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "error",
            "errors": [{"message": "layoutSections is malformed"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let workspace = Workspace::new(temp_dir.path());
    let mut mapping = FlatMapping::new();
    mapping.insert("root.pageTitle", "เกี่ยวกับเรา");
    mapping.insert("root.missing.title", "หาย");
    mapping.save(&workspace.source_mapping()).unwrap();
    mapping.save(&workspace.translated_mapping("th")).unwrap();

    let err = commands::update(&create_cms_client(&server), "123", "th", &workspace)
        .await
        .unwrap_err();

    let message = format!("{:#}", err);
    assert!(message.contains("Failed to update page"));
    assert!(message.contains("layoutSections is malformed"));
    assert!(workspace.source_mapping().exists());
    assert!(workspace.translated_mapping("th").exists());
    assert_eq!(files_in(&workspace.backups_dir()).len(), 1);
}

#[tokio::test]
async fn test_update_falls_back_to_source_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_page()))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let workspace = Workspace::new(temp_dir.path());
    let mut mapping = FlatMapping::new();
    mapping.insert("root.pageTitle", "About us (reviewed)");
    mapping.save(&workspace.source_mapping()).unwrap();

    let outcome = commands::update(&create_cms_client(&server), "123", "th", &workspace)
        .await
        .unwrap();

    assert_eq!(outcome.report.updated, 1);
    assert_eq!(patch_bodies(&server).await[0]["pageTitle"], "About us (reviewed)");
    assert!(!workspace.source_mapping().exists());
}

#[tokio::test]
async fn test_translate_resumes_with_openai_translator() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-openai-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(create_openai_response("```html\nสวัสดี\n```")),
        )
        .expect(2)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let workspace = Workspace::new(temp_dir.path());
    let mut source = FlatMapping::new();
    source.insert("root.a.title", "One");
    source.insert("root.b.title", "Two");
    source.insert("root.c.title", "Three");
    source.save(&workspace.source_mapping()).unwrap();

    let mut checkpoint = FlatMapping::new();
    checkpoint.insert("root.a.title", "หนึ่ง");
    checkpoint.save(&workspace.translated_mapping("th")).unwrap();

    let config = create_translation_config(&format!("{}/v1/chat/completions", server.uri()));
    let translator = OpenAiTranslator::new(reqwest::Client::new(), &config);

    let summary = commands::translate(&translator, &Rules::default(), &config, &workspace)
        .await
        .unwrap();

    assert_eq!(summary.start_index, 1);
    assert_eq!(summary.translated, 2);
    assert!(summary.backup.is_some());

    let translated = FlatMapping::load(&workspace.translated_mapping("th")).unwrap();
    assert_eq!(
        translated.iter().collect::<Vec<_>>(),
        vec![
            ("root.a.title", "หนึ่ง"),
            ("root.b.title", "สวัสดี"),
            ("root.c.title", "สวัสดี"),
        ]
    );
}

#[tokio::test]
async fn test_translate_without_source_mapping_fails() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = Workspace::new(temp_dir.path());
    let config = create_translation_config("http://unused");

    let err = commands::translate(&ShoutTranslator, &Rules::default(), &config, &workspace)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("run extract first"));
}

// ==================== Holiday Workflow Tests ====================

fn create_holiday_page() -> Value {
    json!({
        "id": "123",
        "name": "Holidays",
        "slug": "holidays/template",
        "state": "DRAFT",
        "layoutSections": {"dnd_area": {"rows": [
            {"0": {"rows": [{"0": {"label": "Rich Text", "params": {"html": "<p>template</p>"}}}]}},
            {"0": {"rows": [{"0": {"label": "FAQ Accordion", "params": {"content_group": {}}}}]}}
        ]}}
    })
}

fn write_region(workspace: &Workspace, file: &str, state: &str) {
    std::fs::create_dir_all(workspace.region_data_dir()).unwrap();
    let region = json!({
        "state": state,
        "h1": format!("{} Holidays", state),
        "para": "Intro",
        "h2": "Impact",
        "para2": "Second",
        "para3": "Third",
        "holidays": [
            {"date": "Date", "day": "Day", "name": "Holiday", "type": "Type"},
            {"date": "26 Jan", "day": "Sunday", "name": "Republic Day", "type": "Gazetted"}
        ],
        "types": {"ol": [{"li": "Gazetted - Closed everywhere"}]},
        "faq": {"question": "Is it a day off?", "answer": "Yes."}
    });
    std::fs::write(
        workspace.region_data_dir().join(file),
        serde_json::to_string_pretty(&region).unwrap(),
    )
    .unwrap();
}

#[tokio::test]
async fn test_holiday_fetch_payload_push() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_holiday_page()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(PAGE_PATH))
        .and(body_partial_json(json!({"name": "Holidays"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updatedAt": "now"})))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let workspace = Workspace::new(temp_dir.path());
    let cms = create_cms_client(&server);
    write_region(&workspace, "kerala.json", "Kerala");

    let snapshot = commands::holiday_fetch(&cms, "123", &workspace).await.unwrap();
    assert_eq!(snapshot, workspace.page_content());

    let payload = commands::holiday_payload(&workspace, Path::new("kerala.json")).unwrap();
    assert!(payload.report.rich_text);
    assert!(payload.report.faq);
    assert_eq!(payload.output, workspace.updated_page("kerala"));

    let archived = commands::holiday_push(&cms, "123", &workspace).await.unwrap();
    assert_eq!(archived, workspace.updated_dir().join("updated_kerala_page_content.json"));
    assert!(archived.exists());
    assert!(!workspace.page_content().exists());
    assert!(!workspace.updated_page("kerala").exists());

    let sent = &patch_bodies(&server).await[0];
    let mut keys: Vec<&str> = sent.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["layoutSections", "name", "slug"]);
    let rows = &sent["layoutSections"]["dnd_area"]["rows"];
    let html = rows[0]["0"]["rows"][0]["0"]["params"]["html"].as_str().unwrap();
    assert!(html.contains("<td>Republic Day</td>"));
    assert!(html.contains("<li><strong>Gazetted -</strong> Closed everywhere</li>"));
    assert_eq!(
        rows[1]["0"]["rows"][0]["0"]["params"]["content_group"]["faq_list"][0]["answer"],
        "<p>Yes.</p>"
    );
}

#[tokio::test]
async fn test_holiday_push_failure_keeps_files() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(405))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let workspace = Workspace::new(temp_dir.path());
    std::fs::write(workspace.page_content(), "{}").unwrap();
    std::fs::write(
        workspace.updated_page("assam"),
        serde_json::to_string(&create_holiday_page()).unwrap(),
    )
    .unwrap();

    let err = commands::holiday_push(&create_cms_client(&server), "123", &workspace)
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("405"));
    assert!(workspace.updated_page("assam").exists());
    assert!(workspace.page_content().exists());
}

#[tokio::test]
async fn test_holiday_clone_collects_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cms/v3/pages/site-pages/clone"))
        .and(body_partial_json(json!({"id": "123", "cloneName": "[Holiday] - Andhra Pradesh"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "555"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cms/v3/pages/site-pages/clone"))
        .and(body_partial_json(json!({"cloneName": "[Holiday] - Kerala"})))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let workspace = Workspace::new(temp_dir.path());
    write_region(&workspace, "kerala.json", "Kerala");
    write_region(&workspace, "delhi.json", "Delhi");
    write_region(&workspace, "andhra-pradesh.json", "Andhra-Pradesh");

    let summary = commands::holiday_clone(
        &create_cms_client(&server),
        "123",
        &workspace,
        &["delhi.json".to_string()],
    )
    .await
    .unwrap();

    assert_eq!(summary.cloned, vec![("andhra-pradesh".to_string(), "555".to_string())]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "kerala");
    assert!(summary.failed[0].1.contains("boom"));
}
