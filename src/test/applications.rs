#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rocket::http::{ContentType, Status};
    use rocket::tokio;
    use serde_json::{Value, json};

    use crate::api::{InternshipPage, InternshipResponse};
    use crate::db::{
        get_internship_applications, get_student_applications, submit_application,
        update_application_status,
    };
    use crate::error::AppError;
    use crate::models::{ApplicationStatus, InternshipApplication, StudentApplication};
    use crate::test::test_db::{TestDbBuilder, TestInternship, create_standard_test_db};
    use crate::test::test_utils::{STANDARD_PASSWORD, bearer, login_test_user, setup_test_client};

    const ALICE: &str = "alice@student.nitw.ac.in";
    const BOB: &str = "bob@student.nitw.ac.in";
    const CCPD: &str = "ccpd@nitw.ac.in";

    #[tokio::test]
    async fn test_duplicate_application_conflicts() {
        let test_db = create_standard_test_db().await;
        let alice = test_db.user_id(ALICE).unwrap();
        let internship = test_db.internship_id("Frontend Intern").unwrap();

        let first = submit_application(&test_db.pool, alice, internship, Some("https://cv.example/alice"))
            .await
            .expect("First application should succeed");
        assert_eq!(first.application.status, ApplicationStatus::Applied);
        assert_eq!(first.internship.title, "Frontend Intern");
        assert_eq!(first.application.resume_url.as_deref(), Some("https://cv.example/alice"));

        let second = submit_application(&test_db.pool, alice, internship, None).await;
        match second {
            Err(AppError::Conflict(msg)) => {
                assert_eq!(msg, "You have already applied to this internship.")
            }
            other => panic!("Expected Conflict, got {other:?}"),
        }

        assert_eq!(test_db.application_count(internship).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_past_deadline_creates_nothing() {
        let test_db = TestDbBuilder::new()
            .ccpd(CCPD)
            .student(ALICE, "CSE")
            .internship(
                TestInternship::new("Closed Posting", "Acme Corp")
                    .deadline(Utc::now() - Duration::days(1)),
            )
            .build()
            .await
            .expect("Failed to build test database");

        let alice = test_db.user_id(ALICE).unwrap();
        let internship = test_db.internship_id("Closed Posting").unwrap();

        let result = submit_application(&test_db.pool, alice, internship, None).await;
        assert!(matches!(result, Err(AppError::DeadlinePassed(_))));
        assert_eq!(test_db.application_count(internship).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_internship_is_not_found() {
        let test_db = create_standard_test_db().await;
        let alice = test_db.user_id(ALICE).unwrap();

        let result = submit_application(&test_db.pool, alice, 9_999, None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_listings_are_enriched_and_newest_first() {
        let test_db = create_standard_test_db().await;
        let alice = test_db.user_id(ALICE).unwrap();
        let bob = test_db.user_id(BOB).unwrap();
        let data = test_db.internship_id("Data Analyst Intern").unwrap();
        let frontend = test_db.internship_id("Frontend Intern").unwrap();

        submit_application(&test_db.pool, alice, data, None).await.unwrap();
        submit_application(&test_db.pool, alice, frontend, None).await.unwrap();
        submit_application(&test_db.pool, bob, data, Some("https://cv.example/bob"))
            .await
            .unwrap();

        let mine = get_student_applications(&test_db.pool, alice).await.unwrap();
        let titles: Vec<&str> = mine.iter().map(|a| a.internship.title.as_str()).collect();
        assert_eq!(titles, vec!["Frontend Intern", "Data Analyst Intern"]);
        assert_eq!(mine[1].internship.domain, vec!["Data Science".to_string()]);

        let applicants = get_internship_applications(&test_db.pool, data).await.unwrap();
        assert_eq!(applicants.len(), 2);
        assert_eq!(applicants[0].student.email, BOB);
        assert_eq!(applicants[0].student.branch.as_deref(), Some("ECE"));
        assert_eq!(applicants[0].application.resume_url.as_deref(), Some("https://cv.example/bob"));
        assert_eq!(applicants[1].student.id, alice);
    }

    #[tokio::test]
    async fn test_any_status_transition_is_allowed() {
        let test_db = TestDbBuilder::new()
            .ccpd(CCPD)
            .student(ALICE, "CSE")
            .internship(TestInternship::new("Backend Engineer Intern", "Acme Corp"))
            .application(ALICE, "Backend Engineer Intern", ApplicationStatus::Offered)
            .build()
            .await
            .expect("Failed to build test database");

        let internship = test_db.internship_id("Backend Engineer Intern").unwrap();
        let id = get_internship_applications(&test_db.pool, internship).await.unwrap()[0]
            .application
            .id;

        let detail = update_application_status(&test_db.pool, id, ApplicationStatus::Applied)
            .await
            .unwrap();
        assert_eq!(detail.application.status, ApplicationStatus::Applied);
        assert_eq!(detail.internship.title, "Backend Engineer Intern");
        assert_eq!(detail.student.email, ALICE);

        let missing = update_application_status(&test_db.pool, id + 100, ApplicationStatus::Withdrawn).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[rocket::async_test]
    async fn test_cse_ece_end_to_end() {
        let test_db = TestDbBuilder::new()
            .ccpd(CCPD)
            .student(ALICE, "CSE")
            .student(BOB, "ECE")
            .build()
            .await
            .expect("Failed to build test database");
        let (client, _) = setup_test_client(test_db).await;

        let ccpd = login_test_user(&client, CCPD, STANDARD_PASSWORD).await;
        let alice = login_test_user(&client, ALICE, STANDARD_PASSWORD).await;
        let bob = login_test_user(&client, BOB, STANDARD_PASSWORD).await;

        let tomorrow = (Utc::now() + Duration::days(1)).to_rfc3339();
        let response = client
            .post("/api/internships")
            .header(ContentType::JSON)
            .header(bearer(&ccpd))
            .body(
                json!({
                    "title": "Web Intern",
                    "companyName": "Acme Corp",
                    "description": "Build the web",
                    "location": "Warangal",
                    "deadline": tomorrow,
                    "domain": ["Web Development"],
                    "branch": ["CSE"]
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let created: InternshipResponse = response.into_json().await.unwrap();
        let internship_id = created.internship.id;

        let cse_view: InternshipPage = client
            .get("/api/internships")
            .header(bearer(&alice))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(cse_view.internships.iter().any(|i| i.id == internship_id));

        let ece_view: InternshipPage = client
            .get("/api/internships")
            .header(bearer(&bob))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(ece_view.internships.iter().all(|i| i.id != internship_id));
        assert_eq!(ece_view.total_items, 0);

        let response = client
            .post("/api/applications")
            .header(ContentType::JSON)
            .header(bearer(&alice))
            .body(json!({ "internshipId": internship_id }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let submitted: Value = response.into_json().await.unwrap();
        assert_eq!(submitted["status"], "Applied");
        assert_eq!(submitted["internship"]["id"], internship_id);
        assert!(submitted.get("message").is_none());

        let mine: Vec<StudentApplication> = client
            .get("/api/applications/my")
            .header(bearer(&alice))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].application.status, ApplicationStatus::Applied);
        assert_eq!(mine[0].internship.id, internship_id);
        let application_id = mine[0].application.id;

        let response = client
            .patch(format!("/api/applications/{application_id}/status"))
            .header(ContentType::JSON)
            .header(bearer(&ccpd))
            .body(json!({ "status": "Shortlisted" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["id"], application_id);
        assert_eq!(body["status"], "Shortlisted");
        assert_eq!(body["student"]["email"], ALICE);
        assert_eq!(body["internship"]["title"], "Web Intern");

        let applicants: Vec<InternshipApplication> = client
            .get(format!("/api/applications/internship/{internship_id}"))
            .header(bearer(&ccpd))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(applicants.len(), 1);
        assert_eq!(applicants[0].application.status, ApplicationStatus::Shortlisted);
        assert_eq!(applicants[0].student.name, "alice");
    }

    #[rocket::async_test]
    async fn test_application_routes_enforce_roles() {
        let test_db = create_standard_test_db().await;
        let internship = test_db.internship_id("Frontend Intern").unwrap();
        let (client, _) = setup_test_client(test_db).await;

        let ccpd = login_test_user(&client, CCPD, STANDARD_PASSWORD).await;
        let alice = login_test_user(&client, ALICE, STANDARD_PASSWORD).await;

        let response = client
            .post("/api/applications")
            .header(ContentType::JSON)
            .header(bearer(&ccpd))
            .body(json!({ "internshipId": internship }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["message"], "Only students can apply.");

        let response = client.get("/api/applications/my").header(bearer(&ccpd)).dispatch().await;
        assert_eq!(response.status(), Status::Forbidden);

        let response = client
            .get(format!("/api/applications/internship/{internship}"))
            .header(bearer(&alice))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        let response = client.get("/api/applications/my").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_application_validation_errors() {
        let test_db = create_standard_test_db().await;
        let internship = test_db.internship_id("Frontend Intern").unwrap();
        let (client, _) = setup_test_client(test_db).await;

        let ccpd = login_test_user(&client, CCPD, STANDARD_PASSWORD).await;
        let alice = login_test_user(&client, ALICE, STANDARD_PASSWORD).await;

        let response = client
            .post("/api/applications")
            .header(ContentType::JSON)
            .header(bearer(&alice))
            .body(json!({}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .post("/api/applications")
            .header(ContentType::JSON)
            .header(bearer(&alice))
            .body(json!({ "internshipId": internship }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let body: Value = response.into_json().await.unwrap();
        let application_id = body["id"].as_i64().unwrap();
        assert_eq!(body["internship"]["title"], "Frontend Intern");

        let response = client
            .post("/api/applications")
            .header(ContentType::JSON)
            .header(bearer(&alice))
            .body(json!({ "internshipId": internship }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);

        for bad in [json!({ "status": "hired" }), json!({ "status": "" }), json!({})] {
            let response = client
                .patch(format!("/api/applications/{application_id}/status"))
                .header(ContentType::JSON)
                .header(bearer(&ccpd))
                .body(bad.to_string())
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::BadRequest, "body: {bad}");
        }

        let response = client
            .patch(format!("/api/applications/{application_id}/status"))
            .header(ContentType::JSON)
            .header(bearer(&ccpd))
            .body(json!({ "status": "shortlisted" }).to_string())
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert!(body["message"].as_str().unwrap().starts_with("Invalid status. Must be one of:"));

        let response = client
            .patch("/api/applications/9999/status")
            .header(ContentType::JSON)
            .header(bearer(&ccpd))
            .body(json!({ "status": "Offered" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
