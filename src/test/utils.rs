#[cfg(test)]
pub mod test_db {
    use crate::auth::Role;
    use crate::db::{create_internship, create_user};
    use crate::error::AppError;
    use crate::models::{ApplicationStatus, InternshipDraft, InternshipType, NewUser};
    use chrono::{DateTime, Duration, Utc};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};
    use std::collections::HashMap;
    use std::sync::Once;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        internships: Vec<TestInternship>,
        applications: Vec<TestApplication>,
    }

    pub struct TestUser {
        pub email: String,
        pub name: String,
        pub role: Role,
        pub branch: Option<String>,
        pub password: String,
    }

    #[derive(Clone)]
    pub struct TestInternship {
        pub title: String,
        pub company_name: String,
        pub description: String,
        pub location: String,
        pub internship_type: InternshipType,
        pub cgpa_cutoff: Option<f64>,
        pub deadline: DateTime<Utc>,
        pub domain: Vec<String>,
        pub skills: Vec<String>,
        pub branch: Vec<String>,
    }

    impl TestInternship {
        pub fn new(title: &str, company_name: &str) -> Self {
            Self {
                title: title.to_string(),
                company_name: company_name.to_string(),
                description: format!("{title} at {company_name}"),
                location: "Hyderabad".to_string(),
                internship_type: InternshipType::FullTime,
                cgpa_cutoff: None,
                deadline: Utc::now() + Duration::days(30),
                domain: Vec::new(),
                skills: Vec::new(),
                branch: Vec::new(),
            }
        }

        pub fn location(mut self, location: &str) -> Self {
            self.location = location.to_string();
            self
        }

        pub fn description(mut self, description: &str) -> Self {
            self.description = description.to_string();
            self
        }

        pub fn cgpa(mut self, cutoff: f64) -> Self {
            self.cgpa_cutoff = Some(cutoff);
            self
        }

        pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
            self.deadline = deadline;
            self
        }

        pub fn domain(mut self, tags: &[&str]) -> Self {
            self.domain = tags.iter().map(|t| t.to_string()).collect();
            self
        }

        pub fn skills(mut self, tags: &[&str]) -> Self {
            self.skills = tags.iter().map(|t| t.to_string()).collect();
            self
        }

        pub fn branch(mut self, branches: &[&str]) -> Self {
            self.branch = branches.iter().map(|b| b.to_string()).collect();
            self
        }

        fn draft(&self) -> InternshipDraft {
            InternshipDraft {
                title: self.title.clone(),
                company_name: self.company_name.clone(),
                description: self.description.clone(),
                location: self.location.clone(),
                internship_type: self.internship_type,
                salary: None,
                cgpa_cutoff: self.cgpa_cutoff,
                deadline: self.deadline,
                domain: self.domain.clone(),
                skills: self.skills.clone(),
                branch: self.branch.clone(),
                internship_period: None,
                company_logo_url: String::new(),
                responsibilities: String::new(),
                about_company: String::new(),
            }
        }
    }

    pub struct TestApplication {
        pub student_email: String,
        pub internship_title: String,
        pub status: ApplicationStatus,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn student(mut self, email: &str, branch: &str) -> Self {
            self.users.push(TestUser {
                email: email.to_string(),
                name: email.split('@').next().unwrap_or(email).to_string(),
                role: Role::Student,
                branch: Some(branch.to_string()),
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn ccpd(mut self, email: &str) -> Self {
            self.users.push(TestUser {
                email: email.to_string(),
                name: "Placement Office".to_string(),
                role: Role::Ccpd,
                branch: None,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn admin(mut self, email: &str) -> Self {
            self.users.push(TestUser {
                email: email.to_string(),
                name: "Administrator".to_string(),
                role: Role::Admin,
                branch: None,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn internship(mut self, internship: TestInternship) -> Self {
            self.internships.push(internship);
            self
        }

        /// Seeds an application directly, skipping the deadline and duplicate checks.
        pub fn application(
            mut self,
            student_email: &str,
            internship_title: &str,
            status: ApplicationStatus,
        ) -> Self {
            self.applications.push(TestApplication {
                student_email: student_email.to_string(),
                internship_title: internship_title.to_string(),
                status,
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter("warn")
                    .with_test_writer()
                    .try_init();
            });

            // One connection: every connection to `sqlite::memory:` is its own database.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let mut user_id_map: HashMap<String, i64> = HashMap::new();
            let mut internship_id_map: HashMap<String, i64> = HashMap::new();

            for user in &self.users {
                let user_id = create_user(
                    &pool,
                    &NewUser {
                        name: user.name.clone(),
                        email: user.email.clone(),
                        password: user.password.clone(),
                        role: user.role,
                        branch: user.branch.clone(),
                    },
                )
                .await?;

                user_id_map.insert(user.email.clone(), user_id);
            }

            let poster = self
                .users
                .iter()
                .find(|u| matches!(u.role, Role::Ccpd | Role::Admin))
                .map(|u| user_id_map[&u.email]);

            for internship in &self.internships {
                let posted_by = poster.ok_or_else(|| {
                    AppError::Internal("seeding internships needs a ccpd or admin user".to_string())
                })?;

                let created = create_internship(&pool, &internship.draft(), posted_by).await?;
                internship_id_map.insert(internship.title.clone(), created.id);
            }

            for application in &self.applications {
                let now = Utc::now();
                sqlx::query(
                    "INSERT INTO applications (student_id, internship_id, status, applied_at, updated_at)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(user_id_map[&application.student_email])
                .bind(internship_id_map[&application.internship_title])
                .bind(application.status)
                .bind(now)
                .bind(now)
                .execute(&pool)
                .await?;
            }

            Ok(TestDb {
                pool,
                user_id_map,
                internship_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
        pub internship_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn user_id(&self, email: &str) -> Option<i64> {
            self.user_id_map.get(email).copied()
        }

        pub fn internship_id(&self, title: &str) -> Option<i64> {
            self.internship_id_map.get(title).copied()
        }

        pub async fn application_count(&self, internship_id: i64) -> Result<i64, sqlx::Error> {
            sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE internship_id = ?")
                .bind(internship_id)
                .fetch_one(&self.pool)
                .await
        }
    }

    /// Two CSE/ECE students, one ccpd officer and four postings with mixed
    /// branch rules, domains and cutoffs.
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .ccpd("ccpd@nitw.ac.in")
            .admin("admin@nitw.ac.in")
            .student("alice@student.nitw.ac.in", "CSE")
            .student("bob@student.nitw.ac.in", "ECE")
            .internship(
                TestInternship::new("Backend Engineer Intern", "Acme Corp")
                    .location("Bangalore")
                    .domain(&["Web Development", "Cloud"])
                    .skills(&["Rust", "SQL"])
                    .branch(&["CSE"])
                    .cgpa(7.5),
            )
            .internship(
                TestInternship::new("VLSI Design Intern", "Chipworks")
                    .location("Hyderabad")
                    .domain(&["Hardware"])
                    .skills(&["Verilog"])
                    .branch(&["ECE", "EEE"])
                    .cgpa(8.0),
            )
            .internship(
                TestInternship::new("Data Analyst Intern", "Numbers Inc")
                    .location("Remote")
                    .domain(&["Data Science"])
                    .skills(&["Python", "SQL"])
                    .cgpa(7.5),
            )
            .internship(
                TestInternship::new("Frontend Intern", "Acme Corp")
                    .location("Pune")
                    .domain(&["Web Development"])
                    .skills(&["TypeScript"]),
            )
            .build()
            .await
            .expect("Failed to build standard test database")
    }
}

#[cfg(test)]
pub mod test_utils {
    use rocket::http::{ContentType, Header, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use std::path::PathBuf;
    use uuid::Uuid;

    use crate::api::AuthResponse;
    use crate::config::AppConfig;
    use crate::init_rocket;

    pub use super::test_db::*;

    const TEST_SECRET_KEY: &str = "6c9d1f3a0b7e24c58d6f1a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f";

    pub fn test_config() -> AppConfig {
        let upload_dir: PathBuf = std::env::temp_dir().join(format!("internhub-test-{}", Uuid::new_v4()));

        AppConfig {
            upload_dir: upload_dir.to_string_lossy().into_owned(),
            ..AppConfig::default()
        }
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        setup_test_client_with_config(test_db, test_config()).await
    }

    pub async fn setup_test_client_with_config(test_db: TestDb, config: AppConfig) -> (Client, TestDb) {
        std::fs::create_dir_all(&config.upload_dir).expect("Failed to create upload dir");

        let figment = AppConfig::figment()
            .merge(("secret_key", TEST_SECRET_KEY))
            .merge(("log_level", "off"));

        let rocket = init_rocket(test_db.pool.clone(), config, figment).await;
        let client = Client::untracked(rocket)
            .await
            .expect("Failed to create Rocket test client");

        (client, test_db)
    }

    pub async fn login_test_user(client: &Client, email: &str, password: &str) -> String {
        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(json!({ "email": email, "password": password }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok, "Login failed for {email}");

        let auth: AuthResponse = response
            .into_json()
            .await
            .expect("Login response was not valid JSON");
        auth.token
    }

    pub fn bearer(token: &str) -> Header<'static> {
        Header::new("Authorization", format!("Bearer {token}"))
    }

    #[test]
    fn test_secret_key_is_accepted() {
        let figment = AppConfig::figment().merge(("secret_key", TEST_SECRET_KEY));
        let config: rocket::Config = figment
            .extract()
            .expect("Test secret key should be a valid Rocket secret key");

        assert_eq!(TEST_SECRET_KEY.len(), 64);
        assert!(!config.secret_key.is_zero());
    }
}
