use crate::config::ApiConfig;
use async_trait::async_trait;
use memorie_core::remote::{ApiError, ApiResult, AuthApi, ContactSource, FaceRecognizer};
use memorie_core::types::{
    Contact, ContactUpdate, CreateContactRequest, LoginResponse, RecognitionResponse,
    RegisterResponse, TrustedContact, TrustedContactRequest, TrustedContactsList,
    UserLoginRequest, UserProfile, UserRegistrationRequest,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// File name the recognition endpoint expects for the captured frame.
pub const CAPTURED_IMAGE_NAME: &str = "captured-image.jpg";
/// File name used when uploading a trusted contact's picture.
pub const PROFILE_IMAGE_NAME: &str = "profile-image.jpg";

/// Stateless backend client. No retries, no timeouts, no auth header.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            base_url: config.base_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and split off non-2xx responses as backend errors.
    async fn call<F>(&self, method: Method, path: &str, build: F) -> ApiResult<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        tracing::debug!(%method, path, "api request");
        let url = format!("{}{}", self.base_url, path);
        let request = build(self.http.request(method.clone(), url));

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "api request failed");
            ApiError::Network
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_error_body(status.as_u16(), &body);
        tracing::warn!(%method, path, status = status.as_u16(), error = %err, "api request rejected");
        Err(err)
    }

    async fn call_json<T, F>(&self, method: Method, path: &str, build: F) -> ApiResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        let response = self.call(method, path, build).await?;
        response.json::<T>().await.map_err(|e| {
            tracing::warn!(path, error = %e, "unreadable api response body");
            ApiError::Network
        })
    }

    /// For endpoints whose success body is empty or irrelevant.
    async fn call_empty<F>(&self, method: Method, path: &str, build: F) -> ApiResult<()>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        self.call(method, path, build).await.map(|_| ())
    }

    pub async fn register_user(
        &self,
        request: &UserRegistrationRequest,
    ) -> ApiResult<RegisterResponse> {
        self.call_json(Method::POST, "/user", |r| r.json(request)).await
    }

    pub async fn login_user(&self, request: &UserLoginRequest) -> ApiResult<LoginResponse> {
        self.call_json(Method::POST, "/login", |r| r.json(request)).await
    }

    pub async fn logout_user(&self) -> ApiResult<()> {
        self.call_empty(Method::POST, "/logout", json_header).await
    }

    pub async fn get_user_profile(&self) -> ApiResult<UserProfile> {
        self.call_json(Method::GET, "/profile", json_header).await
    }

    pub async fn get_contacts(&self) -> ApiResult<Vec<Contact>> {
        self.call_json(Method::GET, "/contacts", json_header).await
    }

    pub async fn create_contact(&self, request: &CreateContactRequest) -> ApiResult<Contact> {
        self.call_json(Method::POST, "/contacts", |r| r.json(request)).await
    }

    /// Multipart upload: the form fields plus an optional JPEG picture.
    pub async fn create_trusted_contact(
        &self,
        request: &TrustedContactRequest,
        picture: Option<Vec<u8>>,
    ) -> ApiResult<TrustedContact> {
        let mut form = Form::new();
        for (name, value) in request.form_fields() {
            form = form.text(name, value);
        }
        if let Some(bytes) = picture {
            form = form.part("image", jpeg_part(bytes, PROFILE_IMAGE_NAME)?);
        }
        self.call_json(Method::POST, "/trusted-contact", |r| r.multipart(form))
            .await
    }

    pub async fn get_contact(&self, id: &str) -> ApiResult<Contact> {
        self.call_json(Method::GET, &format!("/contact/{id}"), json_header)
            .await
    }

    pub async fn update_contact(&self, id: &str, update: &ContactUpdate) -> ApiResult<Contact> {
        self.call_json(Method::PUT, &format!("/contact/{id}"), |r| r.json(update))
            .await
    }

    pub async fn delete_contact(&self, id: &str) -> ApiResult<()> {
        self.call_empty(Method::DELETE, &format!("/contact/{id}"), json_header)
            .await
    }

    pub async fn get_trusted_contacts_by_user_id(
        &self,
        user_id: &str,
    ) -> ApiResult<Vec<TrustedContact>> {
        let list: TrustedContactsList = self
            .call_json(
                Method::GET,
                &format!("/trusted-contacts/user/{user_id}"),
                json_header,
            )
            .await?;
        tracing::debug!(count = list.contacts.len(), "trusted contacts fetched");
        Ok(list.contacts)
    }

    pub async fn recognize_face(
        &self,
        jpeg: &[u8],
        user_id: &str,
    ) -> ApiResult<RecognitionResponse> {
        let form = Form::new()
            .part("image", jpeg_part(jpeg.to_vec(), CAPTURED_IMAGE_NAME)?)
            .text("userId", user_id.to_string());
        self.call_json(Method::POST, "/face-recognition", |r| r.multipart(form))
            .await
    }
}

fn json_header(request: RequestBuilder) -> RequestBuilder {
    request.header(reqwest::header::CONTENT_TYPE, "application/json")
}

fn jpeg_part(bytes: Vec<u8>, file_name: &'static str) -> ApiResult<Part> {
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("image/jpeg")
        .map_err(|e| {
            tracing::warn!(error = %e, "could not build image part");
            ApiError::Network
        })
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn register_user(&self, request: &UserRegistrationRequest) -> ApiResult<RegisterResponse> {
        ApiClient::register_user(self, request).await
    }

    async fn login_user(&self, request: &UserLoginRequest) -> ApiResult<LoginResponse> {
        ApiClient::login_user(self, request).await
    }

    async fn logout_user(&self) -> ApiResult<()> {
        ApiClient::logout_user(self).await
    }
}

#[async_trait]
impl ContactSource for ApiClient {
    async fn get_trusted_contacts_by_user_id(&self, user_id: &str) -> ApiResult<Vec<TrustedContact>> {
        ApiClient::get_trusted_contacts_by_user_id(self, user_id).await
    }
}

#[async_trait]
impl FaceRecognizer for ApiClient {
    async fn recognize_face(&self, jpeg: &[u8], user_id: &str) -> ApiResult<RecognitionResponse> {
        ApiClient::recognize_face(self, jpeg, user_id).await
    }
}
