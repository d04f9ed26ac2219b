//! User entity.
//!
//! A [`User`] is identified by `(username, hostname)` and printed as its
//! userid, `username@hostname`. The password is local-only; the biography is
//! owned by the server and pulled on construction and on [`User::sync`].

use crate::error::{ClientError, ClientResult};
use crate::field::{push, FieldWrite};
use crate::http::{Credentials, Method, StatusCode};
use crate::registry::{identity_semantics, Identity};
use crate::server::{Auth, Server};
use crate::session::Context;
use crate::validation::{
    usermask_to_tuple, validate_hostname, validate_known_username, validate_username,
};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

/// A Wididit user.
pub struct User {
    username: String,
    server: Arc<Server>,
    state: RwLock<UserState>,
}

struct UserState {
    password: Option<Zeroizing<String>>,
    biography: String,
}

impl Identity for User {
    type Key = (String, String);
    const NAMESPACE: &'static str = "wididit.people";
    const TYPE_NAME: &'static str = "People";

    fn identity_key(&self) -> Self::Key {
        (self.username.clone(), self.server.hostname().to_string())
    }

    fn refresh_from(&self, fresh: Self) {
        let fresh = fresh.state.into_inner();
        let mut state = self.state.write();
        state.biography = fresh.biography;
        if fresh.password.is_some() {
            state.password = fresh.password;
        }
    }
}

identity_semantics!(User);

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.server.hostname())
    }
}

#[derive(Deserialize)]
struct UserReply {
    biography: Option<String>,
}

impl User {
    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the server the user is registered on.
    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    /// Returns the hostname of the user's server.
    pub fn hostname(&self) -> &str {
        self.server.hostname()
    }

    /// Returns `username@hostname`.
    pub fn userid(&self) -> String {
        self.to_string()
    }

    /// Returns the path of this user in the API.
    pub fn api_path(&self) -> String {
        people_path(&self.userid())
    }

    /// Returns the locally known password.
    pub fn password(&self) -> Option<Zeroizing<String>> {
        self.state.read().password.clone()
    }

    /// Returns the cached biography.
    pub fn biography(&self) -> String {
        self.state.read().biography.clone()
    }

    pub(crate) fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password(),
        }
    }

    /// Pulls the biography from the server, discarding the cached one.
    pub fn sync(&self) -> ClientResult<()> {
        let biography = fetch_biography(&self.server, &self.userid(), Auth::Connected)?;
        self.state.write().biography = biography;
        Ok(())
    }

    /// Changes the password remotely, then locally.
    pub fn set_password(&self, password: &str) -> ClientResult<()> {
        push(
            &self.server,
            FieldWrite {
                path: &self.api_path(),
                payload: json!({ "password": password }),
                action: "change the password",
                denied: &[StatusCode::FORBIDDEN],
            },
        )?;
        self.state.write().password = Some(Zeroizing::new(password.to_string()));
        Ok(())
    }

    /// Changes the biography remotely, then locally.
    pub fn set_biography(&self, biography: &str) -> ClientResult<()> {
        push(
            &self.server,
            FieldWrite {
                path: &self.api_path(),
                payload: json!({ "username": self.username, "biography": biography }),
                action: "change the biography",
                denied: &[StatusCode::FORBIDDEN, StatusCode::UNAUTHORIZED],
            },
        )?;
        self.state.write().biography = biography.to_string();
        Ok(())
    }

    /// Checks whether the server recognizes the current credentials as
    /// this user's.
    pub fn is_authenticated(&self) -> ClientResult<bool> {
        Ok(self.server.whoami()?.as_deref() == Some(self.userid().as_str()))
    }

    /// Authenticates every later request to this user's server as this
    /// user.
    pub fn connect(self: &Arc<Self>) {
        self.server.set_connected_as(Arc::clone(self));
    }

    /// Unbinds this user from its server, if it is the connected one.
    pub fn disconnect(&self) {
        if self.server.connected_as().is_some_and(|u| *u == *self) {
            self.server.clear_connected_as();
        }
    }
}

fn people_path(userid: &str) -> String {
    format!("/people/{userid}/")
}

fn fetch_biography(server: &Server, userid: &str, auth: Auth) -> ClientResult<String> {
    let response = server.send(
        Method::Get,
        &people_path(userid),
        Vec::new(),
        None,
        auth,
    )?;
    match response.status {
        StatusCode::OK => {
            let reply: UserReply = server.decode(&response)?;
            Ok(reply.biography.unwrap_or_default())
        }
        StatusCode::NOT_FOUND => Err(ClientError::not_found(userid)),
        status => Err(ClientError::server(status)),
    }
}

/// Builds a [`User`], optionally registering and connecting it.
///
/// Obtained from [`crate::Wididit::user`].
#[must_use]
pub struct UserBuilder {
    ctx: Arc<Context>,
    username: String,
    hostname: String,
    password: Option<Zeroizing<String>>,
    email: Option<String>,
    connect: bool,
    register: bool,
}

impl UserBuilder {
    pub(crate) fn new(ctx: Arc<Context>, username: &str, hostname: &str) -> Self {
        Self {
            ctx,
            username: username.to_string(),
            hostname: hostname.to_string(),
            password: None,
            email: None,
            connect: false,
            register: false,
        }
    }

    /// Sets the password used to authenticate or register.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    /// Sets the email used to register.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Connects the server as this user once built.
    pub fn connect(mut self, connect: bool) -> Self {
        self.connect = connect;
        self
    }

    /// Registers the user on the server before the first sync.
    pub fn register(mut self, register: bool) -> Self {
        self.register = register;
        self
    }

    /// Validates, optionally registers, syncs and returns the user.
    ///
    /// Registration needs both a password and an email; either missing is
    /// reported before any request is made. Only a name being registered
    /// must match the registration pattern; existing accounts are taken as
    /// the server names them.
    pub fn build(self) -> ClientResult<Arc<User>> {
        if self.register {
            validate_username(&self.username)?;
        } else {
            validate_known_username(&self.username)?;
        }
        validate_hostname(&self.hostname)?;

        let registration = if self.register {
            let password = self
                .password
                .as_ref()
                .ok_or(ClientError::MissingArgument { name: "password" })?;
            let email = self
                .email
                .as_ref()
                .ok_or(ClientError::MissingArgument { name: "email" })?;
            Some(json!({
                "username": self.username,
                "password": password.as_str(),
                "email": email,
            }))
        } else {
            None
        };

        let server = self.ctx.server(&self.hostname)?;
        let userid = format!("{}@{}", self.username, self.hostname);

        if let Some(payload) = registration {
            register(&server, &payload)?;
            debug!(%userid, "registered");
        }

        let auth = if self.connect {
            Auth::As(Credentials {
                username: self.username.clone(),
                password: self.password.clone(),
            })
        } else {
            Auth::Connected
        };
        let biography = fetch_biography(&server, &userid, auth)?;

        let fresh = User {
            username: self.username,
            server: Arc::clone(&server),
            state: RwLock::new(UserState {
                password: self.password,
                biography,
            }),
        };
        let user = self.ctx.users.resolve(fresh.identity_key(), fresh);
        if self.connect {
            user.connect();
        }
        Ok(user)
    }
}

fn register(server: &Server, payload: &Value) -> ClientResult<()> {
    let response = server.send(
        Method::Post,
        "/people/",
        Vec::new(),
        Some(payload),
        Auth::Anonymous,
    )?;
    match response.status {
        StatusCode::OK | StatusCode::CREATED => Ok(()),
        StatusCode::FORBIDDEN => Err(ClientError::forbidden("register")),
        status => Err(ClientError::server(status)),
    }
}

/// Any supported representation of a user.
#[derive(Debug, Clone)]
pub enum UserRef {
    /// An existing user.
    User(Arc<User>),
    /// A userid, or a bare username completed with the default host.
    Userid(String),
    /// A `(username, hostname)` pair.
    Pair(String, String),
    /// A server reply: a mapping with `username` and `server.hostname`,
    /// a userid string, or a two-string array.
    Reply(Value),
}

impl From<Arc<User>> for UserRef {
    fn from(user: Arc<User>) -> Self {
        UserRef::User(user)
    }
}

impl From<&Arc<User>> for UserRef {
    fn from(user: &Arc<User>) -> Self {
        UserRef::User(Arc::clone(user))
    }
}

impl From<&str> for UserRef {
    fn from(userid: &str) -> Self {
        UserRef::Userid(userid.to_string())
    }
}

impl From<String> for UserRef {
    fn from(userid: String) -> Self {
        UserRef::Userid(userid)
    }
}

impl<A: Into<String>, B: Into<String>> From<(A, B)> for UserRef {
    fn from((username, hostname): (A, B)) -> Self {
        UserRef::Pair(username.into(), hostname.into())
    }
}

impl From<Value> for UserRef {
    fn from(reply: Value) -> Self {
        UserRef::Reply(reply)
    }
}

/// Normalizes any representation into a user of this session.
pub(crate) fn resolve_user(
    ctx: &Arc<Context>,
    data: UserRef,
    default_host: Option<&str>,
) -> ClientResult<Arc<User>> {
    match data {
        UserRef::User(user) => Ok(user),
        UserRef::Userid(userid) => {
            let (username, hostname) = usermask_to_tuple(&userid, default_host)?;
            UserBuilder::new(Arc::clone(ctx), &username, &hostname).build()
        }
        UserRef::Pair(username, hostname) => {
            UserBuilder::new(Arc::clone(ctx), &username, &hostname).build()
        }
        UserRef::Reply(value) => {
            let (username, hostname) = reply_to_tuple(&value, default_host)?;
            UserBuilder::new(Arc::clone(ctx), &username, &hostname).build()
        }
    }
}

fn reply_to_tuple(value: &Value, default_host: Option<&str>) -> ClientResult<(String, String)> {
    match value {
        Value::String(userid) => usermask_to_tuple(userid, default_host),
        Value::Array(items) => match items.as_slice() {
            [Value::String(username), Value::String(hostname)] => {
                Ok((username.clone(), hostname.clone()))
            }
            _ => Err(invalid_representation(value)),
        },
        Value::Object(map) => {
            let username = map.get("username").and_then(Value::as_str);
            let hostname = map
                .get("server")
                .and_then(|server| server.get("hostname"))
                .and_then(Value::as_str);
            match (username, hostname) {
                (Some(username), Some(hostname)) => {
                    Ok((username.to_string(), hostname.to_string()))
                }
                _ => Err(invalid_representation(value)),
            }
        }
        _ => Err(invalid_representation(value)),
    }
}

fn invalid_representation(value: &Value) -> ClientError {
    ClientError::invalid_value(format!("invalid representation of a user: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, IdentityModes};
    use crate::http::{HttpRequest, HttpResponse, Method};
    use crate::mock::MockClient;
    use crate::Wididit;

    /// Answers like a server where every user exists and only
    /// authenticated writes succeed.
    fn people_server(request: &HttpRequest) -> HttpResponse {
        let path = request.api_path();
        match (request.method, path.strip_prefix("/people/")) {
            (Method::Get, Some(rest)) => {
                let userid = rest.trim_end_matches('/');
                let (username, hostname) = userid.split_once('@').unwrap();
                HttpResponse::json(
                    StatusCode::OK,
                    &json!({
                        "username": username,
                        "biography": format!("biography of user {userid}"),
                        "server": {"hostname": hostname},
                    }),
                )
            }
            (Method::Put, Some(_)) if request.credentials.is_some() => {
                HttpResponse::empty(StatusCode::OK)
            }
            (Method::Post, Some("")) => HttpResponse::empty(StatusCode::CREATED),
            _ => HttpResponse::empty(StatusCode::FORBIDDEN),
        }
    }

    fn session() -> (Arc<MockClient>, Wididit) {
        let client = Arc::new(MockClient::new(|r| Ok(people_server(r))));
        let wididit = Wididit::new(Config::default(), Arc::clone(&client));
        (client, wididit)
    }

    #[test]
    fn basics() {
        let (_, wididit) = session();
        let people = wididit.user("tester", "test.wididit.net").build().unwrap();
        assert_eq!(
            format!("{people:?}"),
            r#"wididit.people.People("tester", "test.wididit.net")"#
        );
        let people2 = wididit.user("tester", "test.wididit.net").build().unwrap();
        let people3 = wididit.user("tester", "test2.wididit.net").build().unwrap();
        let people4 = wididit.user("tester2", "test.wididit.net").build().unwrap();
        assert_eq!(people, people2);
        assert_ne!(people, people3);
        assert_ne!(people, people4);
        // Users are value-equal by default, not shared
        assert!(!Arc::ptr_eq(&people, &people2));
    }

    #[test]
    fn biography_is_synced_on_construction() {
        let (_, wididit) = session();
        let people = wididit.user("tester", "test.wididit.net").build().unwrap();
        assert_eq!(people.userid(), "tester@test.wididit.net");
        assert_eq!(
            people.biography(),
            "biography of user tester@test.wididit.net"
        );
    }

    #[test]
    fn set_biography_when_connected() {
        let (client, wididit) = session();
        let people = wididit
            .user("tester", "test.wididit.net")
            .password("foo")
            .connect(true)
            .build()
            .unwrap();
        client.take_requests();

        people.set_biography("foo").unwrap();
        let requests = client.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Put);
        assert_eq!(requests[0].api_path(), "/people/tester@test.wididit.net/");
        let body = people
            .server()
            .unserialize(requests[0].body.as_deref().unwrap())
            .unwrap();
        assert_eq!(body, json!({"username": "tester", "biography": "foo"}));
        assert_eq!(people.biography(), "foo");
    }

    #[test]
    fn set_biography_without_authentication() {
        let (_, wididit) = session();
        let people = wididit
            .user("tester", "test.wididit.net")
            .password("foo")
            .build()
            .unwrap();
        let err = people.set_biography("foo").unwrap_err();
        assert!(matches!(err, ClientError::Forbidden { .. }));
        assert_eq!(
            people.biography(),
            "biography of user tester@test.wididit.net"
        );
    }

    #[test]
    fn unauthorized_biography_write_is_forbidden() {
        let (client, wididit) = session();
        let people = wididit.user("tester", "test.wididit.net").build().unwrap();
        client.set_handler(|_| Ok(HttpResponse::empty(StatusCode::UNAUTHORIZED)));
        assert!(matches!(
            people.set_biography("x").unwrap_err(),
            ClientError::Forbidden { .. }
        ));
    }

    #[test]
    fn set_password() {
        let (client, wididit) = session();
        let people = wididit
            .user("tester", "test.wididit.net")
            .password("old")
            .connect(true)
            .build()
            .unwrap();
        people.set_password("new").unwrap();
        assert_eq!(people.password().as_deref().map(String::as_str), Some("new"));

        client.set_handler(|_| Ok(HttpResponse::empty(StatusCode::FORBIDDEN)));
        let err = people.set_password("newer").unwrap_err();
        assert_eq!(err.to_string(), "you are not authorized to change the password");
        assert_eq!(people.password().as_deref().map(String::as_str), Some("new"));

        client.set_handler(|_| Ok(HttpResponse::empty(StatusCode::UNAUTHORIZED)));
        let err = people.set_password("newer").unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn connect_uses_own_credentials() {
        let (client, wididit) = session();
        let people = wididit
            .user("tester", "test.wididit.net")
            .password("secret")
            .connect(true)
            .build()
            .unwrap();

        let credentials = client.requests()[0].credentials.clone().unwrap();
        assert_eq!(credentials.username, "tester");
        assert_eq!(credentials.password.as_deref().map(String::as_str), Some("secret"));
        assert_eq!(people.server().connected_as().as_ref(), Some(&people));

        people.disconnect();
        assert!(people.server().connected_as().is_none());
    }

    #[test]
    fn sync_maps_statuses() {
        let (client, wididit) = session();
        let people = wididit.user("tester", "test.wididit.net").build().unwrap();

        client.set_handler(|_| Ok(HttpResponse::empty(StatusCode::NOT_FOUND)));
        let err = people.sync().unwrap_err();
        assert_eq!(err.to_string(), "tester@test.wididit.net cannot be found");

        client.set_handler(|_| Ok(HttpResponse::empty(StatusCode::BAD_GATEWAY)));
        assert_eq!(people.sync().unwrap_err().status(), Some(StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn failed_construction_is_not_registered() {
        let client = Arc::new(MockClient::with_status(StatusCode::NOT_FOUND));
        let config = Config::default().with_identity(IdentityModes::all_shared());
        let wididit = Wididit::new(config, Arc::clone(&client));

        let err = wididit.user("ghost", "test.wididit.net").build().unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
        assert_eq!(wididit.registered_users(), 0);
    }

    #[test]
    fn shared_users_are_refreshed() {
        let client = Arc::new(MockClient::new(|r| Ok(people_server(r))));
        let config = Config::default().with_identity(IdentityModes::all_shared());
        let wididit = Wididit::new(config, Arc::clone(&client));

        let first = wididit.user("tester", "test.wididit.net").build().unwrap();
        assert!(first.password().is_none());
        let second = wididit
            .user("tester", "test.wididit.net")
            .password("pw")
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.password().is_some());
    }

    #[test]
    fn register_requires_password_and_email() {
        let (client, wididit) = session();
        let err = wididit
            .user("newbie", "test.wididit.net")
            .email("n@example.org")
            .register(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingArgument { name: "password" }));

        let err = wididit
            .user("newbie", "test.wididit.net")
            .password("pw")
            .register(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingArgument { name: "email" }));
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn register_posts_credentials() {
        let (client, wididit) = session();
        wididit
            .user("newbie", "test.wididit.net")
            .password("pw")
            .email("n@example.org")
            .register(true)
            .build()
            .unwrap();

        let request = &client.requests()[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.api_path(), "/people/");
        let server = wididit.server("test.wididit.net").unwrap();
        let body = server.unserialize(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"username": "newbie", "password": "pw", "email": "n@example.org"})
        );
    }

    #[test]
    fn register_forbidden() {
        let client = Arc::new(MockClient::with_status(StatusCode::FORBIDDEN));
        let wididit = Wididit::new(Config::default(), Arc::clone(&client));
        let err = wididit
            .user("newbie", "test.wididit.net")
            .password("pw")
            .email("n@example.org")
            .register(true)
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "you are not authorized to register");
    }

    #[test]
    fn invalid_username_is_rejected_locally() {
        let (client, wididit) = session();
        let err = wididit
            .user("Tester", "test.wididit.net")
            .password("pw")
            .email("tester@example.org")
            .register(true)
            .build()
            .unwrap_err();
        assert!(err.is_people_error());

        let err = wididit.user("No Way", "test.wididit.net").build().unwrap_err();
        assert!(err.is_people_error());
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn existing_users_skip_registration_pattern() {
        let (_, wididit) = session();
        let people = wididit
            .user_from_anything("Tester@dev.progval.42", None)
            .unwrap();
        assert_eq!(people.userid(), "Tester@dev.progval.42");
        assert_eq!(people.username(), "Tester");
    }

    #[test]
    fn from_anything() {
        let (_, wididit) = session();
        let people = wididit
            .user_from_anything("tester@dev.progval.42", None)
            .unwrap();
        assert_eq!(people.userid(), "tester@dev.progval.42");

        let same = wididit.user_from_anything(&people, None).unwrap();
        assert!(Arc::ptr_eq(&people, &same));

        let pair = wididit
            .user_from_anything(("tester", "dev.progval.42"), None)
            .unwrap();
        assert_eq!(pair.userid(), "tester@dev.progval.42");

        let reply = wididit
            .user_from_anything(
                json!({"username": "tester", "server": {"hostname": "dev.progval.42"}}),
                None,
            )
            .unwrap();
        assert_eq!(reply, people);
    }

    #[test]
    fn from_anything_with_default_host() {
        let (_, wididit) = session();
        let people = wididit
            .user_from_anything("tester", Some("test.wididit.net"))
            .unwrap();
        assert_eq!(people.userid(), "tester@test.wididit.net");

        let err = wididit.user_from_anything("tester", None).unwrap_err();
        assert!(err.is_people_error());
    }

    #[test]
    fn from_anything_rejects_unknown_shapes() {
        let (client, wididit) = session();
        for value in [json!(42), json!({"username": "tester"}), json!(["a"])] {
            let err = wididit.user_from_anything(value, None).unwrap_err();
            assert!(matches!(err, ClientError::InvalidValue { .. }));
        }
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn is_authenticated() {
        let client = Arc::new(MockClient::new(|request| {
            if request.api_path() == "/whoami/" {
                Ok(HttpResponse::json(
                    StatusCode::OK,
                    &json!({"username": "tester", "server": {"hostname": "test.wididit.net"}}),
                ))
            } else {
                Ok(people_server(request))
            }
        }));
        let wididit = Wididit::new(Config::default(), Arc::clone(&client));
        let tester = wididit.user("tester", "test.wididit.net").build().unwrap();
        let other = wididit.user("other", "test.wididit.net").build().unwrap();
        assert!(tester.is_authenticated().unwrap());
        assert!(!other.is_authenticated().unwrap());
    }
}
