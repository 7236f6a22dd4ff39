//! Request handlers for the TinyAMS pages.
//!
//! Handlers are transport-agnostic: they take the session token the
//! client presented (if any) plus the submitted form fields, and return a
//! [`Response`] describing what the HTTP layer should send back. Binding
//! them to routes, cookies and templates is the embedding server's job.

use std::collections::HashMap;

use serde_json::{Value, json};
use surrealdb::{Connection, Surreal};
use tinyams_auth::{AuthConfig, AuthService, LoginInput};
use tinyams_core::error::{AmsError, AmsResult};
use tinyams_core::models::association::CreateAssociation;
use tinyams_core::models::person::{CreatePerson, Person, PersonEntry, PersonFields};
use tinyams_core::repository::{AssociationRepository, PersonRepository, PersonSearch};
use tinyams_core::validation::is_checked;
use tinyams_db::repository::{
    SurrealAssociationRepository, SurrealPersonRepository, SurrealPersonSearch,
    SurrealSessionRepository,
};
use tracing::error;
use uuid::Uuid;

/// Submitted form fields, by name.
pub type Form = HashMap<String, String>;

/// What the transport layer should answer with.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Render `template` with `context`.
    Render { template: &'static str, context: Value },
    /// `303 See Other` to `location`.
    Redirect(String),
    /// Error page with a user-facing message.
    Apology { status: u16, message: String },
    /// Login succeeded: store `token` in the session cookie and redirect
    /// to `location`.
    SignedIn { token: String, location: String },
}

impl Response {
    fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect(location.into())
    }

    fn render(template: &'static str, context: Value) -> Self {
        Self::Render { template, context }
    }
}

impl From<AmsError> for Response {
    fn from(err: AmsError) -> Self {
        match err {
            AmsError::SessionRequired => Response::redirect("/login"),
            AmsError::Database(_) | AmsError::Crypto(_) | AmsError::Internal(_) => {
                error!(error = %err, "Request failed");
                Response::Apology {
                    status: err.status_code(),
                    message: "Something went wrong".into(),
                }
            }
            _ => Response::Apology {
                status: err.status_code(),
                message: err.to_string(),
            },
        }
    }
}

fn finish(result: AmsResult<Response>) -> Response {
    result.unwrap_or_else(Response::from)
}

fn field<'a>(form: &'a Form, name: &str) -> Option<&'a str> {
    form.get(name).map(String::as_str)
}

fn text(form: &Form, name: &str) -> String {
    field(form, name).map(str::trim).unwrap_or_default().to_string()
}

fn person_fields(form: &Form) -> PersonFields {
    PersonFields {
        is_member: is_checked(field(form, "is_member")),
        username: text(form, "username"),
        first_name: text(form, "first_name"),
        middle_name: text(form, "middle_name"),
        last_name: text(form, "last_name"),
        email: text(form, "email"),
        phone: text(form, "phone"),
        employer: text(form, "employer"),
        job_title: text(form, "job_title"),
    }
}

/// Path ids that are not UUIDs cannot name a person, so they get the
/// same answer as an id that does not exist.
fn person_id(raw: &str) -> AmsResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AmsError::not_found("person", raw))
}

fn profile_context(person: &Person) -> Value {
    json!({ "person": PersonEntry::from(person) })
}

type Auth<C> = AuthService<SurrealAssociationRepository<C>, SurrealSessionRepository<C>>;

/// The application: repositories and the session gate over one storage
/// handle.
pub struct App<C: Connection> {
    associations: SurrealAssociationRepository<C>,
    persons: SurrealPersonRepository<C>,
    search: SurrealPersonSearch<C>,
    auth: Auth<C>,
}

impl<C: Connection> App<C> {
    pub fn new(db: Surreal<C>, config: AuthConfig) -> Self {
        let (associations, persons, gate_associations) = match &config.pepper {
            Some(p) => (
                SurrealAssociationRepository::with_pepper(db.clone(), p.clone()),
                SurrealPersonRepository::with_pepper(db.clone(), p.clone()),
                SurrealAssociationRepository::with_pepper(db.clone(), p.clone()),
            ),
            None => (
                SurrealAssociationRepository::new(db.clone()),
                SurrealPersonRepository::new(db.clone()),
                SurrealAssociationRepository::new(db.clone()),
            ),
        };

        Self {
            associations,
            persons,
            search: SurrealPersonSearch::new(db.clone()),
            auth: AuthService::new(gate_associations, SurrealSessionRepository::new(db), config),
        }
    }

    pub fn auth(&self) -> &Auth<C> {
        &self.auth
    }

    /// Gate plus the association name every signed-in page shows.
    async fn signed_in(&self, token: Option<&str>) -> AmsResult<(Uuid, String)> {
        let association_id = self.auth.require_session(token).await?;
        let association = self.associations.get_by_id(association_id).await?;
        Ok((association_id, association.name))
    }

    // -----------------------------------------------------------------
    // Public pages
    // -----------------------------------------------------------------

    /// `GET /`
    pub fn index(&self) -> Response {
        Response::render("index.html", json!({}))
    }

    /// `GET /create_account`
    pub fn create_account_form(&self) -> Response {
        Response::render("create_account.html", json!({}))
    }

    /// `POST /create_account`
    pub async fn create_account(&self, form: &Form) -> Response {
        finish(self.try_create_account(form).await)
    }

    async fn try_create_account(&self, form: &Form) -> AmsResult<Response> {
        let input = CreateAssociation {
            name: text(form, "name"),
            email: text(form, "email"),
            username: text(form, "username"),
            password: field(form, "password").unwrap_or_default().to_string(),
        };
        input.validate()?;

        self.associations.create(input).await?;
        Ok(Response::redirect("/login"))
    }

    /// `GET /login`. Visiting the login page signs the client out.
    pub async fn login_form(&self, token: Option<&str>) -> Response {
        finish(
            self.auth
                .logout(token)
                .await
                .map(|()| Response::render("login.html", json!({}))),
        )
    }

    /// `POST /login`
    pub async fn login(&self, token: Option<&str>, form: &Form) -> Response {
        let input = LoginInput {
            username: field(form, "username").map(str::to_string),
            password: field(form, "password").map(str::to_string),
            previous_token: token.map(str::to_string),
        };

        finish(self.auth.login(input).await.map(|out| Response::SignedIn {
            token: out.token,
            location: "/dashboard".into(),
        }))
    }

    /// `GET /logout`
    pub async fn logout(&self, token: Option<&str>) -> Response {
        finish(
            self.auth
                .logout(token)
                .await
                .map(|()| Response::redirect("/login")),
        )
    }

    // -----------------------------------------------------------------
    // Signed-in pages
    // -----------------------------------------------------------------

    /// `GET /dashboard`
    pub async fn dashboard(&self, token: Option<&str>) -> Response {
        finish(self.try_dashboard(token).await)
    }

    async fn try_dashboard(&self, token: Option<&str>) -> AmsResult<Response> {
        let (association_id, association_name) = self.signed_in(token).await?;
        let counts = self.persons.count(association_id).await?;

        Ok(Response::render(
            "dashboard.html",
            json!({
                "association_name": association_name,
                "person_count": counts.total,
                "member_count": counts.members,
                "nonmember_count": counts.non_members,
            }),
        ))
    }

    /// `GET /create_person`
    pub async fn create_person_form(&self, token: Option<&str>) -> Response {
        finish(self.signed_in(token).await.map(|(_, association_name)| {
            Response::render(
                "create_person.html",
                json!({ "association_name": association_name }),
            )
        }))
    }

    /// `POST /create_person`
    pub async fn create_person(&self, token: Option<&str>, form: &Form) -> Response {
        finish(self.try_create_person(token, form).await)
    }

    async fn try_create_person(&self, token: Option<&str>, form: &Form) -> AmsResult<Response> {
        let association_id = self.auth.require_session(token).await?;

        let input = CreatePerson {
            association_id,
            password: field(form, "password").unwrap_or_default().to_string(),
            fields: person_fields(form),
        };
        input.validate()?;

        self.persons.create(input).await?;
        Ok(Response::redirect("/dashboard"))
    }

    /// `GET /search`
    pub async fn search_form(&self, token: Option<&str>) -> Response {
        finish(self.signed_in(token).await.map(|(_, association_name)| {
            Response::render("search.html", json!({ "association_name": association_name }))
        }))
    }

    /// `POST /search`. A blank `search_criteria` lists the whole roster.
    pub async fn search(&self, token: Option<&str>, form: &Form) -> Response {
        finish(self.try_search(token, form).await)
    }

    async fn try_search(&self, token: Option<&str>, form: &Form) -> AmsResult<Response> {
        let (association_id, association_name) = self.signed_in(token).await?;
        let criteria = field(form, "search_criteria").unwrap_or_default();

        let results = self.search.search(association_id, criteria).await?;
        Ok(Response::render(
            "search_results.html",
            json!({
                "association_name": association_name,
                "criteria": criteria,
                "results": results,
            }),
        ))
    }

    /// `GET /profile/{id}`
    pub async fn profile(&self, token: Option<&str>, id: &str) -> Response {
        finish(self.try_show_person(token, id, "profile.html").await)
    }

    /// `GET /edit_profile/{id}`
    pub async fn edit_person_form(&self, token: Option<&str>, id: &str) -> Response {
        finish(self.try_show_person(token, id, "edit_person.html").await)
    }

    async fn try_show_person(
        &self,
        token: Option<&str>,
        id: &str,
        template: &'static str,
    ) -> AmsResult<Response> {
        let (association_id, association_name) = self.signed_in(token).await?;
        let person = self.persons.get_by_id(association_id, person_id(id)?).await?;

        let mut context = profile_context(&person);
        context["association_name"] = Value::String(association_name);
        Ok(Response::render(template, context))
    }

    /// `POST /edit_profile/{id}`
    pub async fn edit_person(&self, token: Option<&str>, id: &str, form: &Form) -> Response {
        finish(self.try_edit_person(token, id, form).await)
    }

    async fn try_edit_person(
        &self,
        token: Option<&str>,
        id: &str,
        form: &Form,
    ) -> AmsResult<Response> {
        let association_id = self.auth.require_session(token).await?;
        let id = person_id(id)?;

        let fields = person_fields(form);
        fields.validate()?;

        self.persons.update(association_id, id, fields).await?;
        Ok(Response::redirect(format!("/profile/{id}")))
    }

    /// `GET /delete_person/{id}`
    pub async fn delete_person(&self, token: Option<&str>, id: &str) -> Response {
        finish(self.try_delete_person(token, id).await)
    }

    async fn try_delete_person(&self, token: Option<&str>, id: &str) -> AmsResult<Response> {
        let association_id = self.auth.require_session(token).await?;
        let id = person_id(id)?;

        self.persons.delete(association_id, id).await?;
        Ok(Response::redirect("/dashboard"))
    }
}
