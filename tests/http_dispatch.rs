//! End-to-end HTTP dispatch against a mock backend.

use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde_json::{json, Value};
use wirecall::config::{new_context, RequestConfig};
use wirecall::contract::{compile_all, Argument, FilePart};
use wirecall::descriptor::extract_source;
use wirecall::http::{DispatchError, HttpDispatcher};
use wirecall::EndpointContract;

mod common;
use common::MockResponse;

const USERS: &str = r#"
@Controller('users')
export class UsersController {
  @Get(':id')
  findOne(@Param('id') id: string, @Query() filter: Filter, @Headers('X-Tenant') tenant: string) {}

  @Post()
  create(@Body() dto: CreateUserDto, @Req() req: Request): Promise<User> {}

  @Post(':id/documents')
  @UseInterceptors(FileFieldsInterceptor([{ name: 'documents', maxCount: 5 }, { name: 'images', maxCount: 2 }]))
  upload(
    @Param('id') id: string,
    @UploadedFiles() files: { documents?: Express.Multer.File[]; images?: Express.Multer.File[] },
    @Body('title') title: string,
  ) {}
}
"#;

fn contracts() -> BTreeMap<String, EndpointContract> {
    let extraction = extract_source(USERS);
    assert!(extraction.errors.is_empty(), "{:?}", extraction.errors);
    compile_all(&extraction.services)
        .into_iter()
        .map(|c| (c.method.clone(), c))
        .collect()
}

fn dispatcher(base_url: String) -> HttpDispatcher {
    HttpDispatcher::reqwest(RequestConfig::new().with_base_url(base_url))
        .with_default_context(new_context(
            RequestConfig::new().with_header("x-client", "wirecall-tests"),
        ))
}

#[tokio::test]
async fn test_get_with_path_query_and_headers() {
    let (addr, captured) =
        common::start_mock_backend(|_| MockResponse::json(200, r#"{"id":"42","name":"Ada"}"#)).await;
    let contracts = contracts();
    let d = dispatcher(format!("http://{}", addr));

    let response = d
        .endpoint(&contracts["findOne"])
        .call(
            RequestConfig::default(),
            vec![
                Argument::from("42"),
                Argument::from(json!({"active": true, "tag": ["a", "b"]})),
                Argument::from("acme"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Ada");

    let requests = captured.lock().unwrap();
    let req = &requests[0];
    assert_eq!(req.method, "GET");
    assert!(req.target.starts_with("/users/42?"), "{}", req.target);
    assert!(req.target.contains("active=true"));
    assert!(req.target.contains("tag=a&tag=b"));
    assert_eq!(req.headers["x-tenant"], "acme");
    assert_eq!(req.headers["x-client"], "wirecall-tests");
}

#[tokio::test]
async fn test_post_json_body_skips_request_context() {
    let (addr, captured) = common::start_mock_backend(|_| MockResponse::json(201, "{}")).await;
    let contracts = contracts();
    let d = dispatcher(format!("http://{}", addr));

    let response = d
        .dispatch(
            &contracts["create"],
            &[json!({"name": "Ada"}).into(), json!({"ignored": true}).into()],
            &RequestConfig::new().with_header("Authorization", "Bearer t"),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let requests = captured.lock().unwrap();
    let req = &requests[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.target, "/users");
    assert_eq!(req.headers["authorization"], "Bearer t");
    let sent: Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(sent, json!({"name": "Ada"}));
}

#[tokio::test]
async fn test_named_multiple_upload() {
    let (addr, captured) = common::start_mock_backend(|_| MockResponse::json(200, "{}")).await;
    let contracts = contracts();
    let d = dispatcher(format!("http://{}", addr));

    let mut files = BTreeMap::new();
    files.insert(
        "documents".to_string(),
        vec![
            FilePart::new("f1.pdf", "one").with_content_type("application/pdf"),
            FilePart::new("f2.pdf", "two"),
        ],
    );
    files.insert("images".to_string(), vec![FilePart::new("f3.png", "three")]);

    d.dispatch(
        &contracts["upload"],
        &["7".into(), files.into(), "Quarterly".into()],
        &RequestConfig::default(),
    )
    .await
    .unwrap();

    let requests = captured.lock().unwrap();
    let req = &requests[0];
    assert_eq!(req.target, "/users/7/documents");
    assert!(req.headers["content-type"].starts_with("multipart/form-data"));

    let body = req.body_text();
    assert_eq!(body.matches("filename=").count(), 3);
    assert_eq!(body.matches("name=\"documents\"").count(), 2);
    assert_eq!(body.matches("name=\"images\"").count(), 1);
    assert!(body.contains("name=\"title\""));
    assert!(body.contains("Quarterly"));
}

#[tokio::test]
async fn test_non_2xx_is_returned_not_raised() {
    let (addr, _captured) =
        common::start_mock_backend(|_| MockResponse::json(404, r#"{"message":"missing"}"#)).await;
    let contracts = contracts();
    let d = dispatcher(format!("http://{}", addr));

    let response = d
        .endpoint(&contracts["findOne"])
        .call(RequestConfig::default(), vec!["404".into()])
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    match response.error_for_status().await {
        Err(DispatchError::Status { status, body }) => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert!(body.contains("missing"));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let contracts = contracts();
    let d = dispatcher(format!("http://{}", addr));
    let result = d
        .endpoint(&contracts["findOne"])
        .call(RequestConfig::default(), vec!["1".into()])
        .await;
    assert!(matches!(result, Err(DispatchError::Transport(_))));
}
