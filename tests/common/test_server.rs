use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tempfile::TempDir;

pub const ADMIN_PASSWORD: &str = "adminpw1";

pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub client: reqwest::Client,
    server_process: Option<Child>,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let data_dir = temp_dir.path();
        let binary = env!("CARGO_BIN_EXE_filegate");

        let init_output = Command::new(binary)
            .args(["admin", "init", "--data-dir"])
            .arg(data_dir)
            .args(["--admin-password", ADMIN_PASSWORD, "--non-interactive"])
            .output()
            .expect("run init");
        assert!(
            init_output.status.success(),
            "Failed to initialize data dir: {}",
            String::from_utf8_lossy(&init_output.stderr)
        );

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let base_url = format!("http://127.0.0.1:{}", port);

        let server_process = Command::new(binary)
            .args(["serve", "--data-dir"])
            .arg(data_dir)
            .args(["--host", "127.0.0.1", "--port"])
            .arg(port.to_string())
            .env_remove("FILEGATE_SESSION_SECRET")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("start server");

        let client = reqwest::Client::new();
        Self::wait_for_ready(&client, &base_url).await;

        Self {
            temp_dir,
            base_url,
            client,
            server_process: Some(server_process),
        }
    }

    async fn wait_for_ready(client: &reqwest::Client, base_url: &str) {
        for _ in 0..100 {
            if client
                .get(format!("{}/api/health", base_url))
                .send()
                .await
                .is_ok()
            {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        panic!("Server did not become ready");
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir().join("uploads")
    }

    /// Names of committed objects in the uploads directory.
    pub fn stored_objects(&self) -> Vec<String> {
        std::fs::read_dir(self.uploads_dir())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().is_file())
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    pub async fn login_response(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/login"))
            .json(&json!({"username": username, "password": password}))
            .send()
            .await
            .expect("login request")
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let resp = self.login_response(username, password).await;
        assert_eq!(resp.status(), 200, "login as {username} failed");
        let body: Value = resp.json().await.expect("parse login response");
        body["token"].as_str().expect("token").to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin", ADMIN_PASSWORD).await
    }

    pub async fn register(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/register"))
            .json(&json!({"username": username, "password": password}))
            .send()
            .await
            .expect("register request")
    }

    /// Registers a user and returns `(user_id, token)`.
    pub async fn register_and_login(&self, username: &str, password: &str) -> (String, String) {
        let resp = self.register(username, password).await;
        assert_eq!(resp.status(), 201, "register {username} failed");
        let body: Value = resp.json().await.expect("parse register response");
        let user_id = body["user"]["id"].as_str().expect("user id").to_string();
        (user_id, self.login(username, password).await)
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("GET request")
    }

    pub async fn default_category_id(&self, admin_token: &str) -> String {
        let body: Value = self
            .get("/admin/categories", admin_token)
            .await
            .json()
            .await
            .expect("parse categories");
        body["categories"]
            .as_array()
            .expect("categories array")
            .iter()
            .find(|c| c["name"] == "SPOOFER4YOU")
            .expect("default category")["id"]
            .as_str()
            .expect("category id")
            .to_string()
    }

    pub async fn upload(
        &self,
        token: &str,
        filename: &str,
        bytes: Vec<u8>,
        category_id: Option<&str>,
    ) -> reqwest::Response {
        let mut form = Form::new().part("file", Part::bytes(bytes).file_name(filename.to_string()));
        if let Some(category_id) = category_id {
            form = form.text("categoryId", category_id.to_string());
        }

        self.client
            .post(self.url("/admin/upload"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("upload request")
    }

    pub async fn grant(
        &self,
        admin_token: &str,
        user_id: &str,
        subscription_type: &str,
        days: i64,
    ) -> reqwest::Response {
        self.client
            .put(self.url(&format!("/admin/users/{user_id}/subscription")))
            .bearer_auth(admin_token)
            .json(&json!({"type": subscription_type, "days": days}))
            .send()
            .await
            .expect("grant request")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(mut process) = self.server_process.take() {
            let _ = process.kill();
            let _ = process.wait();
        }
    }
}
