use anyhow::{Result, bail};
use std::io::Write;

use crate::{
    runtime::Runtime,
    users::{Connection, ProfileUpdate, User, UserDirectory},
};

use super::config::ConfigOptions;
use super::{connect, failure};

#[derive(Debug, Clone, PartialEq)]
pub enum UsersAction {
    List,
    Show { id: u64 },
    Update { id: u64, update: ProfileUpdate },
    Connections { id: u64 },
    Connect { id: u64, other: u64 },
    Disconnect { id: u64, other: u64 },
}

/// Browse and edit member profiles and connections.
#[tracing::instrument(skip(runtime, options))]
pub async fn users<R: Runtime + 'static>(
    runtime: R,
    options: ConfigOptions,
    action: UsersAction,
) -> Result<()> {
    let (_, services) = connect(runtime, options)?;
    run(&services.users, action, &mut std::io::stdout()).await
}

async fn run<D: UserDirectory + ?Sized>(
    directory: &D,
    action: UsersAction,
    out: &mut dyn Write,
) -> Result<()> {
    match action {
        UsersAction::List => {
            let users = directory
                .list_users()
                .await
                .map_err(|e| failure(e, "Could not list users"))?;
            if users.is_empty() {
                writeln!(out, "No users.")?;
            }
            for user in &users {
                writeln!(out, "{:>5}  {}  <{}>", user.id, user.display_name(), user.email)?;
            }
        }
        UsersAction::Show { id } => {
            let user = directory
                .get_user(id)
                .await
                .map_err(|e| failure(e, "Could not load user"))?;
            print_user(out, &user)?;
        }
        UsersAction::Update { id, update } => {
            if update.is_empty() {
                bail!("Nothing to update, pass at least one profile field");
            }
            let user = directory
                .update_profile(id, &update)
                .await
                .map_err(|e| failure(e, "Profile update failed"))?;
            writeln!(out, "Profile updated.")?;
            print_user(out, &user)?;
        }
        UsersAction::Connections { id } => {
            let connections = directory
                .list_connections(id)
                .await
                .map_err(|e| failure(e, "Could not list connections"))?;
            if connections.is_empty() {
                writeln!(out, "No connections.")?;
            }
            for connection in &connections {
                print_connection(out, connection)?;
            }
        }
        UsersAction::Connect { id, other } => {
            let connection = directory
                .connect(id, other)
                .await
                .map_err(|e| failure(e, "Connect failed"))?;
            writeln!(out, "Connected {} to {}.", id, other)?;
            print_connection(out, &connection)?;
        }
        UsersAction::Disconnect { id, other } => {
            directory
                .disconnect(id, other)
                .await
                .map_err(|e| failure(e, "Disconnect failed"))?;
            writeln!(out, "Disconnected {} from {}.", id, other)?;
        }
    }
    Ok(())
}

fn print_user(out: &mut dyn Write, user: &User) -> std::io::Result<()> {
    writeln!(out, "{} ({})", user.display_name(), user.id)?;
    writeln!(out, "  username:    {}", user.username)?;
    writeln!(out, "  email:       {}", user.email)?;

    let text = [
        ("job", &user.job),
        ("location", &user.location),
        ("gender", &user.gender),
        ("hobby", &user.hobby),
        ("description", &user.description),
    ];
    for (label, value) in text {
        if let Some(value) = value {
            writeln!(out, "  {:<12} {}", format!("{}:", label), value)?;
        }
    }

    let numbers = [
        ("age", user.age),
        ("mental_health", user.mental_health),
        ("wellness", user.wellness),
        ("engage", user.engage),
    ];
    for (label, value) in numbers {
        if let Some(value) = value {
            writeln!(out, "  {:<12} {}", format!("{}:", label), value)?;
        }
    }
    Ok(())
}

fn print_connection(out: &mut dyn Write, connection: &Connection) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>5}  user {}  since {}",
        connection.id, connection.connected_user, connection.created_at
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{ApiError, ValidationErrors};
    use crate::users::MockUserDirectory;
    use mockall::predicate::eq;
    use std::collections::BTreeMap;

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_list_prints_each_user() {
        let mut directory = MockUserDirectory::new();
        directory.expect_list_users().returning(|| {
            Ok(vec![
                User {
                    id: 1,
                    username: "alex".into(),
                    email: "alex@example.com".into(),
                    ..Default::default()
                },
                User {
                    id: 2,
                    username: "sam".into(),
                    first_name: "Sam".into(),
                    last_name: "Lee".into(),
                    email: "sam@example.com".into(),
                    ..Default::default()
                },
            ])
        });

        let mut buf = Vec::new();
        run(&directory, UsersAction::List, &mut buf).await.unwrap();

        let text = output(buf);
        assert!(text.contains("alex  <alex@example.com>"));
        assert!(text.contains("Sam Lee  <sam@example.com>"));
    }

    #[tokio::test]
    async fn test_show_prints_profile_fields() {
        let mut directory = MockUserDirectory::new();
        directory.expect_get_user().with(eq(7)).returning(|id| {
            Ok(User {
                id,
                username: "kim".into(),
                hobby: Some("woodworking".into()),
                age: Some(52),
                ..Default::default()
            })
        });

        let mut buf = Vec::new();
        run(&directory, UsersAction::Show { id: 7 }, &mut buf)
            .await
            .unwrap();

        let text = output(buf);
        assert!(text.starts_with("kim (7)"));
        assert!(text.contains("hobby:       woodworking"));
        assert!(text.contains("age:         52"));
        assert!(!text.contains("job:"));
    }

    #[tokio::test]
    async fn test_update_requires_a_field() {
        let mut directory = MockUserDirectory::new();
        directory.expect_update_profile().never();

        let mut buf = Vec::new();
        let action = UsersAction::Update {
            id: 1,
            update: ProfileUpdate::default(),
        };
        assert!(run(&directory, action, &mut buf).await.is_err());
    }

    #[tokio::test]
    async fn test_update_passes_fields_through() {
        let update = ProfileUpdate {
            job: Some("Nurse".into()),
            ..Default::default()
        };
        let mut directory = MockUserDirectory::new();
        directory
            .expect_update_profile()
            .withf(|id, update| *id == 3 && update.job.as_deref() == Some("Nurse"))
            .times(1)
            .returning(|id, update| {
                Ok(User {
                    id,
                    job: update.job.clone(),
                    ..Default::default()
                })
            });

        let mut buf = Vec::new();
        run(&directory, UsersAction::Update { id: 3, update }, &mut buf)
            .await
            .unwrap();
        assert!(output(buf).contains("Profile updated."));
    }

    #[tokio::test]
    async fn test_connect_error_shows_detail() {
        let mut directory = MockUserDirectory::new();
        directory.expect_connect().returning(|_, _| {
            Err(ApiError::Validation {
                status: 400,
                errors: ValidationErrors {
                    fields: BTreeMap::new(),
                    detail: Some("Cannot connect user to self".into()),
                },
            })
        });

        let mut buf = Vec::new();
        let err = run(&directory, UsersAction::Connect { id: 1, other: 1 }, &mut buf)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot connect user to self");
    }

    #[tokio::test]
    async fn test_connections_and_disconnect() {
        let mut directory = MockUserDirectory::new();
        directory.expect_list_connections().with(eq(1)).returning(|_| {
            Ok(vec![Connection {
                id: 10,
                connected_user: 2,
                created_at: "2024-05-01T12:00:00Z".into(),
            }])
        });
        directory
            .expect_disconnect()
            .with(eq(1), eq(2))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut buf = Vec::new();
        run(&directory, UsersAction::Connections { id: 1 }, &mut buf)
            .await
            .unwrap();
        run(&directory, UsersAction::Disconnect { id: 1, other: 2 }, &mut buf)
            .await
            .unwrap();

        let text = output(buf);
        assert!(text.contains("user 2  since 2024-05-01T12:00:00Z"));
        assert!(text.contains("Disconnected 1 from 2."));
    }
}
