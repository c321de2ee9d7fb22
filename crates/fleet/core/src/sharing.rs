//! Sharing grants on per-truck folders and their reconciliation.

/// A per-truck folder. The folder name is the truck id.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TruckFolder {
    pub id: String,
    pub name: String,
}

/// Graph identity inside a permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Identity set naming who a permission is granted to.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GrantedTo {
    #[serde(default)]
    pub user: Option<Identity>,
}

/// A permission entry on a drive item.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, rename = "grantedToV2")]
    pub granted_to: Option<GrantedTo>,
}

impl Permission {
    /// Lower-cased email of the user this permission names, if any.
    pub fn grantee_email(&self) -> Option<String> {
        self.granted_to
            .as_ref()?
            .user
            .as_ref()?
            .email
            .as_ref()
            .map(|e| e.to_lowercase())
    }
}

/// Observed permissions on one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderGrants {
    pub folder: TruckFolder,
    pub permissions: Vec<Permission>,
}

/// Desired sharing state for the designated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesiredSharing<'a> {
    /// Account email. Unknown means nothing can be reconciled.
    pub grantee: Option<&'a str>,
    /// Truck the account is currently assigned to.
    pub assigned_truck: Option<&'a str>,
}

/// A single change to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantAction {
    /// Delete a permission held by the grantee.
    Revoke {
        folder: TruckFolder,
        permission_id: String,
    },
    /// Invite the grantee to a folder with read access.
    Grant { folder: TruckFolder, email: String },
}

/// Compute the minimal set of changes that leaves the grantee with access to
/// the assigned truck's folder and nothing else.
pub fn reconcile(desired: DesiredSharing<'_>, observed: &[FolderGrants]) -> Vec<GrantAction> {
    let Some(grantee) = desired.grantee.map(str::to_lowercase) else {
        return Vec::new();
    };

    let mut actions = Vec::new();
    for entry in observed {
        let assigned = desired.assigned_truck == Some(entry.folder.name.as_str());
        let held: Vec<&Permission> = entry
            .permissions
            .iter()
            .filter(|p| p.grantee_email().as_deref() == Some(grantee.as_str()))
            .collect();

        if assigned {
            if held.is_empty() {
                actions.push(GrantAction::Grant {
                    folder: entry.folder.clone(),
                    email: grantee.clone(),
                });
            }
            continue;
        }

        actions.extend(held.into_iter().map(|p| GrantAction::Revoke {
            folder: entry.folder.clone(),
            permission_id: p.id.clone(),
        }));
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRANTEE: &str = "test.driver@example.com";

    fn folder(name: &str) -> TruckFolder {
        TruckFolder {
            id: format!("folder-{name}"),
            name: name.into(),
        }
    }

    fn permission(id: &str, email: &str) -> Permission {
        Permission {
            id: id.into(),
            roles: vec!["read".into()],
            granted_to: Some(GrantedTo {
                user: Some(Identity {
                    email: Some(email.into()),
                    display_name: None,
                }),
            }),
        }
    }

    #[test]
    fn test_moves_grant_to_assigned_truck() {
        let observed = vec![
            FolderGrants {
                folder: folder("T-200"),
                permissions: vec![permission("p1", "Test.Driver@example.com")],
            },
            FolderGrants {
                folder: folder("T-305"),
                permissions: vec![permission("p2", "owner@example.com")],
            },
        ];
        let desired = DesiredSharing {
            grantee: Some(GRANTEE),
            assigned_truck: Some("T-305"),
        };

        let actions = reconcile(desired, &observed);
        assert_eq!(
            actions,
            vec![
                GrantAction::Revoke {
                    folder: folder("T-200"),
                    permission_id: "p1".into(),
                },
                GrantAction::Grant {
                    folder: folder("T-305"),
                    email: GRANTEE.into(),
                },
            ]
        );
    }

    #[test]
    fn test_reconciled_state_is_stable() {
        let observed = vec![
            FolderGrants {
                folder: folder("T-200"),
                permissions: vec![],
            },
            FolderGrants {
                folder: folder("T-305"),
                permissions: vec![permission("p9", GRANTEE)],
            },
        ];
        let desired = DesiredSharing {
            grantee: Some(GRANTEE),
            assigned_truck: Some("T-305"),
        };
        assert!(reconcile(desired, &observed).is_empty());
    }

    #[test]
    fn test_unassigned_grantee_loses_every_grant() {
        let observed = vec![FolderGrants {
            folder: folder("T-200"),
            permissions: vec![permission("p1", GRANTEE), permission("p2", GRANTEE)],
        }];
        let desired = DesiredSharing {
            grantee: Some(GRANTEE),
            assigned_truck: None,
        };
        assert_eq!(reconcile(desired, &observed).len(), 2);
    }

    #[test]
    fn test_unknown_grantee_changes_nothing() {
        let observed = vec![FolderGrants {
            folder: folder("T-200"),
            permissions: vec![permission("p1", GRANTEE)],
        }];
        let desired = DesiredSharing {
            grantee: None,
            assigned_truck: Some("T-305"),
        };
        assert!(reconcile(desired, &observed).is_empty());
    }

    #[test]
    fn test_permission_without_user_has_no_grantee() {
        let link = Permission {
            id: "link".into(),
            roles: vec!["read".into()],
            granted_to: None,
        };
        assert_eq!(link.grantee_email(), None);
    }
}
