// tests/assessment_tests.rs
//
// End-to-end coverage of the submission/grading flow and certificate
// lifecycle: normalization shapes, scoring, pass thresholds, issuance
// idempotence, manual re-issue, verification and revocation.

use educonnect::{config::Config, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tempfile::TempDir;

async fn spawn_app() -> (String, SqlitePool, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("educonnect-test.db");
    let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&database_url)
        .expect("Invalid test database URL")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to open test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url,
        jwt_secret: "assessment_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool, temp_dir)
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

async fn register_and_login(client: &reqwest::Client, address: &str, username: &str) -> String {
    client
        .post(&format!("{}/api/auth/register", address))
        .json(&json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .expect("Register failed");

    login(client, address, username).await
}

async fn login(client: &reqwest::Client, address: &str, username: &str) -> String {
    let body: Value = client
        .post(&format!("{}/api/auth/login", address))
        .json(&json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    body["token"].as_str().expect("Token not found").to_string()
}

/// Registers a user, promotes them to tutor, and logs in again so the
/// token carries the tutor role.
async fn setup_tutor(client: &reqwest::Client, address: &str, pool: &SqlitePool) -> String {
    let username = unique_name("tutor");
    register_and_login(client, address, &username).await;

    sqlx::query("UPDATE users SET role = 'tutor' WHERE username = ?")
        .bind(&username)
        .execute(pool)
        .await
        .unwrap();

    login(client, address, &username).await
}

/// Creates and publishes a course owned by the tutor. Returns its id.
async fn create_published_course(
    client: &reqwest::Client,
    address: &str,
    tutor_token: &str,
) -> i64 {
    let created: Value = client
        .post(&format!("{}/api/courses", address))
        .header("Authorization", format!("Bearer {}", tutor_token))
        .json(&json!({
            "title": "Rust Fundamentals",
            "description": "<p>Ownership, borrowing and more.</p>",
            "category": "Programming",
            "tags": ["rust", "programming"]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let course_id = created["id"].as_i64().expect("course id");

    let published = client
        .put(&format!("{}/api/courses/{}", address, course_id))
        .header("Authorization", format!("Bearer {}", tutor_token))
        .json(&json!({ "status": "published" }))
        .send()
        .await
        .unwrap();
    assert_eq!(published.status().as_u16(), 200);

    course_id
}

/// Four multiple-choice questions, passing score 70, published.
fn capitals_assessment(course_id: i64) -> Value {
    json!({
        "courseId": course_id,
        "title": "European Capitals",
        "type": "quiz",
        "status": "published",
        "passingScore": 70,
        "questions": [
            {
                "type": "multiple-choice",
                "content": "Capital of France?",
                "options": ["Paris", "London", "Berlin"],
                "correctAnswer": "Paris"
            },
            {
                "type": "multiple-choice",
                "content": "Capital of the UK?",
                "options": ["Paris", "London", "Berlin"],
                "correctAnswer": "London"
            },
            {
                "type": "multiple-choice",
                "content": "Capital of Germany?",
                "options": ["Paris", "London", "Berlin"],
                "correctAnswer": "Berlin"
            },
            {
                "type": "multiple-choice",
                "content": "Capital of Spain?",
                "options": ["Madrid", "London", "Berlin"],
                "correctAnswer": "Madrid"
            }
        ]
    })
}

async fn create_assessment(
    client: &reqwest::Client,
    address: &str,
    tutor_token: &str,
    payload: &Value,
) -> i64 {
    let response = client
        .post(&format!("{}/api/assessments", address))
        .header("Authorization", format!("Bearer {}", tutor_token))
        .json(payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    body["id"].as_i64().expect("assessment id")
}

/// Question ids in position order, via the public assessment view.
async fn question_ids(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    assessment_id: i64,
) -> Vec<i64> {
    let detail: Value = client
        .get(&format!("{}/api/assessments/{}", address, assessment_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let questions = detail["questions"].as_array().expect("questions");
    // The public view must not leak the answer key.
    for q in questions {
        assert!(q.get("correctAnswer").is_none());
        assert!(q.get("correctAnswers").is_none());
    }
    questions.iter().map(|q| q["id"].as_i64().unwrap()).collect()
}

async fn submit(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    assessment_id: i64,
    answers: Value,
) -> Value {
    let response = client
        .post(&format!("{}/api/assessments/{}/submit", address, assessment_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "answers": answers, "timeSpent": 120 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn passing_submission_scores_and_issues_certificate() {
    let (address, pool, _db) = spawn_app().await;
    let client = reqwest::Client::new();

    let tutor_token = setup_tutor(&client, &address, &pool).await;
    let course_id = create_published_course(&client, &address, &tutor_token).await;
    let assessment_id =
        create_assessment(&client, &address, &tutor_token, &capitals_assessment(course_id)).await;

    let student_token = register_and_login(&client, &address, &unique_name("student")).await;
    let ids = question_ids(&client, &address, &student_token, assessment_id).await;

    // Three correct answers, fourth question skipped entirely.
    let mut answers = serde_json::Map::new();
    answers.insert(ids[0].to_string(), json!("Paris"));
    answers.insert(ids[1].to_string(), json!("London"));
    answers.insert(ids[2].to_string(), json!("Berlin"));

    let result = submit(&client, &address, &student_token, assessment_id, Value::Object(answers)).await;

    assert_eq!(result["score"], 75);
    assert_eq!(result["totalQuestions"], 4);
    assert_eq!(result["correctAnswers"], 3);
    assert_eq!(result["incorrectAnswers"], 1);
    assert_eq!(result["passed"], true);

    let certificate = &result["certificate"];
    assert_eq!(certificate["grade"], "C");
    assert_eq!(certificate["score"], 75);
    assert_eq!(certificate["issuer"], "EduConnect");
    assert_eq!(certificate["status"], "issued");
    let skills: Vec<&str> = certificate["skills"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s.as_str())
        .collect();
    assert_eq!(skills, vec!["rust", "programming"]);
    let credential_id = certificate["credentialId"].as_str().unwrap();
    assert!(credential_id.starts_with("EC-"));
}

#[tokio::test]
async fn second_passing_submission_reuses_certificate() {
    let (address, pool, _db) = spawn_app().await;
    let client = reqwest::Client::new();

    let tutor_token = setup_tutor(&client, &address, &pool).await;
    let course_id = create_published_course(&client, &address, &tutor_token).await;
    let assessment_id =
        create_assessment(&client, &address, &tutor_token, &capitals_assessment(course_id)).await;

    let student_token = register_and_login(&client, &address, &unique_name("student")).await;
    let ids = question_ids(&client, &address, &student_token, assessment_id).await;

    let mut first_answers = serde_json::Map::new();
    first_answers.insert(ids[0].to_string(), json!("Paris"));
    first_answers.insert(ids[1].to_string(), json!("London"));
    first_answers.insert(ids[2].to_string(), json!("Berlin"));
    let first = submit(
        &client,
        &address,
        &student_token,
        assessment_id,
        Value::Object(first_answers),
    )
    .await;
    let first_credential = first["certificate"]["credentialId"].as_str().unwrap().to_string();

    // Retake with a perfect score; the original certificate is reused.
    let mut second_answers = serde_json::Map::new();
    second_answers.insert(ids[0].to_string(), json!("Paris"));
    second_answers.insert(ids[1].to_string(), json!("London"));
    second_answers.insert(ids[2].to_string(), json!("Berlin"));
    second_answers.insert(ids[3].to_string(), json!("Madrid"));
    let second = submit(
        &client,
        &address,
        &student_token,
        assessment_id,
        Value::Object(second_answers),
    )
    .await;

    assert_eq!(second["score"], 100);
    assert_eq!(
        second["certificate"]["credentialId"].as_str().unwrap(),
        first_credential
    );

    // Both submissions persisted, but exactly one certificate row exists.
    let submissions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE assessment_id = ?")
            .bind(assessment_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(submissions, 2);

    let certificates: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM certificates WHERE assessment_id = ?")
            .bind(assessment_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(certificates, 1);
}

#[tokio::test]
async fn failing_submission_gets_no_certificate() {
    let (address, pool, _db) = spawn_app().await;
    let client = reqwest::Client::new();

    let tutor_token = setup_tutor(&client, &address, &pool).await;
    let course_id = create_published_course(&client, &address, &tutor_token).await;
    let assessment_id =
        create_assessment(&client, &address, &tutor_token, &capitals_assessment(course_id)).await;

    let student_token = register_and_login(&client, &address, &unique_name("student")).await;
    let ids = question_ids(&client, &address, &student_token, assessment_id).await;

    let mut answers = serde_json::Map::new();
    answers.insert(ids[0].to_string(), json!("London"));

    let result = submit(&client, &address, &student_token, assessment_id, Value::Object(answers)).await;

    assert_eq!(result["score"], 0);
    assert_eq!(result["passed"], false);
    assert!(result["certificate"].is_null());

    // Manual issuance also refuses without a passing submission.
    let manual = client
        .post(&format!(
            "{}/api/certificates/generate-from-assessment/{}",
            address, assessment_id
        ))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(manual.status().as_u16(), 404);
}

#[tokio::test]
async fn multiple_select_requires_exact_set_match() {
    let (address, pool, _db) = spawn_app().await;
    let client = reqwest::Client::new();

    let tutor_token = setup_tutor(&client, &address, &pool).await;
    let course_id = create_published_course(&client, &address, &tutor_token).await;
    let assessment_id = create_assessment(
        &client,
        &address,
        &tutor_token,
        &json!({
            "courseId": course_id,
            "title": "Systems Languages",
            "type": "quiz",
            "status": "published",
            "passingScore": 100,
            "questions": [{
                "type": "multiple-select",
                "content": "Which of these are systems languages?",
                "options": ["Rust", "C", "Ruby"],
                "correctAnswers": ["Rust", "C"]
            }]
        }),
    )
    .await;

    // Order does not matter.
    let exact = register_and_login(&client, &address, &unique_name("student")).await;
    let ids = question_ids(&client, &address, &exact, assessment_id).await;
    let mut answers = serde_json::Map::new();
    answers.insert(ids[0].to_string(), json!(["C", "Rust"]));
    let result = submit(&client, &address, &exact, assessment_id, Value::Object(answers)).await;
    assert_eq!(result["score"], 100);
    assert_eq!(result["passed"], true);

    // Extra selections fail.
    let extra = register_and_login(&client, &address, &unique_name("student")).await;
    let mut answers = serde_json::Map::new();
    answers.insert(ids[0].to_string(), json!(["Rust", "C", "Ruby"]));
    let result = submit(&client, &address, &extra, assessment_id, Value::Object(answers)).await;
    assert_eq!(result["score"], 0);

    // Partial selections fail.
    let partial = register_and_login(&client, &address, &unique_name("student")).await;
    let mut answers = serde_json::Map::new();
    answers.insert(ids[0].to_string(), json!(["Rust"]));
    let result = submit(&client, &address, &partial, assessment_id, Value::Object(answers)).await;
    assert_eq!(result["score"], 0);
}

#[tokio::test]
async fn list_shaped_answers_are_accepted() {
    let (address, pool, _db) = spawn_app().await;
    let client = reqwest::Client::new();

    let tutor_token = setup_tutor(&client, &address, &pool).await;
    let course_id = create_published_course(&client, &address, &tutor_token).await;
    let assessment_id =
        create_assessment(&client, &address, &tutor_token, &capitals_assessment(course_id)).await;

    let student_token = register_and_login(&client, &address, &unique_name("student")).await;
    let ids = question_ids(&client, &address, &student_token, assessment_id).await;

    let answers = json!([
        { "questionId": ids[0], "selectedAnswer": "Paris" },
        { "questionId": ids[1], "selectedAnswer": ["London"] },
        { "questionId": ids[2], "selectedAnswer": "Berlin" },
        { "questionId": ids[3], "selectedAnswer": "" }
    ]);

    let result = submit(&client, &address, &student_token, assessment_id, answers).await;

    // The empty string counts as skipped, not as a wrong-but-present answer.
    assert_eq!(result["score"], 75);
    assert_eq!(result["correctAnswers"], 3);
}

#[tokio::test]
async fn results_endpoint_returns_latest_attempt_or_404() {
    let (address, pool, _db) = spawn_app().await;
    let client = reqwest::Client::new();

    let tutor_token = setup_tutor(&client, &address, &pool).await;
    let course_id = create_published_course(&client, &address, &tutor_token).await;
    let assessment_id =
        create_assessment(&client, &address, &tutor_token, &capitals_assessment(course_id)).await;

    let student_token = register_and_login(&client, &address, &unique_name("student")).await;

    // No submission yet: 404, not a fabricated result.
    let missing = client
        .get(&format!("{}/api/assessments/{}/results", address, assessment_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);

    let ids = question_ids(&client, &address, &student_token, assessment_id).await;
    let mut answers = serde_json::Map::new();
    answers.insert(ids[0].to_string(), json!("Paris"));
    answers.insert(ids[1].to_string(), json!("London"));
    answers.insert(ids[2].to_string(), json!("Berlin"));
    submit(&client, &address, &student_token, assessment_id, Value::Object(answers)).await;

    let results: Value = client
        .get(&format!("{}/api/assessments/{}/results", address, assessment_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let result = &results["result"];
    assert_eq!(result["score"], 75);
    assert_eq!(result["passed"], true);
    // Full coverage: one graded answer per question, including the skipped one.
    assert_eq!(result["answers"].as_array().unwrap().len(), 4);
    let skipped = result["answers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["questionId"] == ids[3])
        .unwrap();
    assert_eq!(skipped["isCorrect"], false);
}

#[tokio::test]
async fn draft_assessments_reject_submissions() {
    let (address, pool, _db) = spawn_app().await;
    let client = reqwest::Client::new();

    let tutor_token = setup_tutor(&client, &address, &pool).await;
    let course_id = create_published_course(&client, &address, &tutor_token).await;

    let mut payload = capitals_assessment(course_id);
    payload["status"] = json!("draft");
    let assessment_id = create_assessment(&client, &address, &tutor_token, &payload).await;

    let student_token = register_and_login(&client, &address, &unique_name("student")).await;
    let response = client
        .post(&format!("{}/api/assessments/{}/submit", address, assessment_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&json!({ "answers": {}, "timeSpent": 5 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn students_cannot_create_assessments() {
    let (address, pool, _db) = spawn_app().await;
    let client = reqwest::Client::new();

    let tutor_token = setup_tutor(&client, &address, &pool).await;
    let course_id = create_published_course(&client, &address, &tutor_token).await;

    let student_token = register_and_login(&client, &address, &unique_name("student")).await;
    let response = client
        .post(&format!("{}/api/assessments", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&capitals_assessment(course_id))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn certificate_verification_and_revocation() {
    let (address, pool, _db) = spawn_app().await;
    let client = reqwest::Client::new();

    let tutor_token = setup_tutor(&client, &address, &pool).await;
    let course_id = create_published_course(&client, &address, &tutor_token).await;
    let assessment_id =
        create_assessment(&client, &address, &tutor_token, &capitals_assessment(course_id)).await;

    let student_token = register_and_login(&client, &address, &unique_name("student")).await;
    let ids = question_ids(&client, &address, &student_token, assessment_id).await;
    let mut answers = serde_json::Map::new();
    for (id, answer) in ids.iter().zip(["Paris", "London", "Berlin", "Madrid"]) {
        answers.insert(id.to_string(), json!(answer));
    }
    let result = submit(&client, &address, &student_token, assessment_id, Value::Object(answers)).await;
    let credential_id = result["certificate"]["credentialId"].as_str().unwrap().to_string();
    let certificate_db_id = result["certificate"]["id"].as_i64().unwrap();

    // Verification is public: no Authorization header.
    let verified: Value = client
        .get(&format!("{}/api/certificates/verify/{}", address, credential_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["certificate"]["grade"], "A");

    // Unknown credential ids report invalid rather than erroring.
    let unknown: Value = client
        .get(&format!("{}/api/certificates/verify/EC-NOPE-2020-DEADBEEF", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unknown["valid"], false);

    // The student sees the certificate in their list.
    let mine: Value = client
        .get(&format!("{}/api/certificates", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.as_array().unwrap().len(), 1);

    // Manual regeneration reuses the same credential.
    let regenerated: Value = client
        .post(&format!(
            "{}/api/certificates/generate-from-assessment/{}",
            address, assessment_id
        ))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        regenerated["certificate"]["credentialId"].as_str().unwrap(),
        credential_id
    );

    // Revocation flips verification to invalid.
    let admin_name = unique_name("admin");
    let hashed = educonnect::utils::hash::hash_password("password123").unwrap();
    sqlx::query("INSERT INTO users (username, password, role, created_at) VALUES (?, ?, 'admin', ?)")
        .bind(&admin_name)
        .bind(&hashed)
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .unwrap();
    let admin_token = login(&client, &address, &admin_name).await;

    let revoked = client
        .post(&format!("{}/api/admin/certificates/{}/revoke", address, certificate_db_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(revoked.status().as_u16(), 200);

    let verified_after: Value = client
        .get(&format!("{}/api/certificates/verify/{}", address, credential_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(verified_after["valid"], false);
    assert_eq!(verified_after["message"], "Certificate has been revoked");
}

#[tokio::test]
async fn tutor_sees_submissions_students_do_not() {
    let (address, pool, _db) = spawn_app().await;
    let client = reqwest::Client::new();

    let tutor_token = setup_tutor(&client, &address, &pool).await;
    let course_id = create_published_course(&client, &address, &tutor_token).await;
    let assessment_id =
        create_assessment(&client, &address, &tutor_token, &capitals_assessment(course_id)).await;

    let student_token = register_and_login(&client, &address, &unique_name("student")).await;
    let ids = question_ids(&client, &address, &student_token, assessment_id).await;
    let mut answers = serde_json::Map::new();
    answers.insert(ids[0].to_string(), json!("Paris"));
    submit(&client, &address, &student_token, assessment_id, Value::Object(answers)).await;

    let listing: Value = client
        .get(&format!("{}/api/assessments/{}/submissions", address, assessment_id))
        .header("Authorization", format!("Bearer {}", tutor_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing.as_array().unwrap().len(), 1);
    assert_eq!(listing[0]["score"], 25);

    let forbidden = client
        .get(&format!("{}/api/assessments/{}/submissions", address, assessment_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);
}
