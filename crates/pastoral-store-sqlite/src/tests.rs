//! Integration tests for the SQLite accessors against an in-memory store.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use pastoral_core::{
  case::{Case, CaseKind, Channel, CommonCase, Incident},
  category::Category,
  credential::CredentialHasher,
  role::{Permission, Role},
  store::RecordStore,
  user::{Staff, Student, User, UserKind, UserStatus},
};

use crate::{
  CaseStore, CategoryStore, CommonCaseStore, Db, DbConfig, Error,
  IncidentStore, PermissionStore, RoleStore, StaffStore, StudentStore,
  UserStore,
};

// ─── Fixture ─────────────────────────────────────────────────────────────────

/// Deterministic stand-in for the argon2 hasher; the store contract only
/// needs hash/verify to agree with each other.
struct StubHasher;

impl CredentialHasher for StubHasher {
  fn hash(&self, plaintext: &str) -> pastoral_core::Result<String> {
    Ok(format!("stub${plaintext}"))
  }

  fn verify(&self, plaintext: &str, digest: &str) -> bool {
    digest == format!("stub${plaintext}")
  }
}

struct Fixture {
  db:          Db,
  users:       UserStore,
  students:    StudentStore,
  staff:       StaffStore,
  roles:       RoleStore,
  permissions: PermissionStore,
  categories:  CategoryStore,
  cases:       CaseStore,
  commons:     CommonCaseStore,
  incidents:   IncidentStore,
}

async fn fixture() -> Fixture {
  let db = Db::open_in_memory().await.expect("in-memory store");
  let hasher: Arc<dyn CredentialHasher> = Arc::new(StubHasher);

  let users = UserStore::new(&db, hasher);
  let students = StudentStore::new(&db, users.clone());
  let roles = RoleStore::new(&db);
  let staff = StaffStore::new(&db, users.clone(), roles.clone());
  let permissions = PermissionStore::new(&db);
  let categories = CategoryStore::new(&db);
  let cases = CaseStore::new(&db, categories.clone(), students.clone(), users.clone());
  let commons = CommonCaseStore::new(&db, cases.clone());
  let incidents = IncidentStore::new(&db, cases.clone());

  Fixture {
    db,
    users,
    students,
    staff,
    roles,
    permissions,
    categories,
    cases,
    commons,
    incidents,
  }
}

/// Count rows directly, bypassing the accessors.
async fn count_rows(db: &Db, table: &'static str) -> i64 {
  db.connection()
    .call(move |conn| {
      Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
      })?)
    })
    .await
    .unwrap()
}

async fn raw_user_status(db: &Db, id: i64) -> String {
  db.connection()
    .call(move |conn| {
      Ok(conn.query_row(
        "SELECT status FROM users WHERE id = ?1",
        rusqlite::params![id],
        |row| row.get(0),
      )?)
    })
    .await
    .unwrap()
}

// ─── Builders ────────────────────────────────────────────────────────────────

fn user(kind: UserKind, email: &str) -> User {
  User {
    id:          0,
    first_name:  "Ana".into(),
    last_name:   "Silva".into(),
    email:       email.into(),
    credential:  "hunter2".into(),
    document_id: "5.123.456-7".into(),
    status:      UserStatus::Active,
    kind,
  }
}

fn student(email: &str) -> Student {
  Student {
    user:               user(UserKind::Student, email),
    referral_reason:    "teacher referral".into(),
    program:            "CS".into(),
    cohort:             "2024-A".into(),
    phone:              "099123456".into(),
    street:             "18 de Julio".into(),
    door_number:        "1234".into(),
    birth_date:         NaiveDate::from_ymd_opt(2002, 1, 1).unwrap(),
    photo:              None,
    health_system:      "public".into(),
    general_comments:   "prefers morning appointments".into(),
    health_status:      "stable".into(),
    confidential_notes: vec!["initial intake done".into()],
  }
}

async fn saved_student(fx: &Fixture, email: &str) -> Student {
  let id = fx.students.save(&student(email)).await.unwrap();
  fx.students.find_by_id(id).await.unwrap().unwrap()
}

async fn saved_role(fx: &Fixture, name: &str) -> Role {
  let permission_name = format!("{name}:view");
  let pid = fx
    .permissions
    .save(&Permission { id: 0, name: permission_name.clone() })
    .await
    .unwrap();
  let id = fx
    .roles
    .save(&Role {
      id:          0,
      name:        name.into(),
      permissions: vec![Permission { id: pid, name: permission_name }],
    })
    .await
    .unwrap();
  fx.roles.find_by_id(id).await.unwrap().unwrap()
}

async fn saved_staff(fx: &Fixture, email: &str, role_name: &str) -> Staff {
  let role = saved_role(fx, role_name).await;
  let id = fx
    .staff
    .save(&Staff { user: user(UserKind::Staff, email), role: Some(role) })
    .await
    .unwrap();
  fx.staff.find_by_id(id).await.unwrap().unwrap()
}

async fn saved_category(fx: &Fixture, name: &str) -> Category {
  let id = fx
    .categories
    .save(&Category {
      id:          0,
      name:        name.into(),
      description: "academic follow-up".into(),
    })
    .await
    .unwrap();
  fx.categories.find_by_id(id).await.unwrap().unwrap()
}

fn case_record(
  kind: CaseKind,
  category: Category,
  student: Student,
  creator: Staff,
) -> Case {
  Case {
    id: 0,
    title: "missed three sessions".into(),
    code: "CASE-2025-0042".into(),
    occurred_at: Utc.with_ymd_and_hms(2025, 3, 10, 14, 30, 0).unwrap(),
    channel: Channel::InPerson,
    comment: "walk-in".into(),
    confidential: kind.default_confidentiality(),
    category,
    student,
    creator,
    kind,
    calendar_event_id: None,
  }
}

/// A saved common case plus the ids of its relations.
async fn saved_common(fx: &Fixture, tag: &str) -> CommonCase {
  let category = saved_category(fx, &format!("category-{tag}")).await;
  let student = saved_student(fx, &format!("student-{tag}@example.edu")).await;
  let creator =
    saved_staff(fx, &format!("staff-{tag}@example.edu"), &format!("advisor-{tag}"))
      .await;
  let id = fx
    .commons
    .save(&CommonCase {
      case:       case_record(CaseKind::Common, category, student, creator),
      motivation: "wants tutoring support".into(),
    })
    .await
    .unwrap();
  fx.commons.find_by_id(id).await.unwrap().unwrap()
}

// ─── Students ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn student_round_trip() {
  let fx = fixture().await;

  let id = fx.students.save(&student("ana@example.edu")).await.unwrap();
  assert!(id > 0);

  let found = fx.students.find_by_id(id).await.unwrap().unwrap();
  assert_eq!(found.user.id, id);
  assert_eq!(found.user.first_name, "Ana");
  assert_eq!(found.user.kind, UserKind::Student);
  assert_eq!(found.program, "CS");
  assert_eq!(found.birth_date, NaiveDate::from_ymd_opt(2002, 1, 1).unwrap());
  assert_eq!(found.confidential_notes, vec!["initial intake done".to_string()]);
  // The credential came back hashed, not as the plaintext that went in.
  assert_eq!(found.user.credential, "stub$hunter2");
}

#[tokio::test]
async fn student_save_rolls_back_base_row_on_specialization_failure() {
  let fx = fixture().await;

  // Force the specialization insert to fail after the base insert worked.
  fx.db
    .connection()
    .call(|conn| {
      conn.execute("DROP TABLE students", [])?;
      Ok(())
    })
    .await
    .unwrap();

  assert!(fx.students.save(&student("ana@example.edu")).await.is_err());
  assert_eq!(count_rows(&fx.db, "users").await, 0);
}

#[tokio::test]
async fn student_notes_with_embedded_delimiter_are_rejected() {
  let fx = fixture().await;

  let mut bad = student("ana@example.edu");
  bad.confidential_notes = vec!["seen 2024, follow up".into()];

  let err = fx.students.save(&bad).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(pastoral_core::Error::DelimiterInValue(_))
  ));
  assert_eq!(count_rows(&fx.db, "users").await, 0);
}

#[tokio::test]
async fn student_update_rewrites_both_tables() {
  let fx = fixture().await;
  let mut s = saved_student(&fx, "ana@example.edu").await;

  s.user.last_name = "Silva de León".into();
  s.program = "Mathematics".into();
  s.confidential_notes = vec!["intake".into(), "second meeting".into()];
  fx.students.update(&s).await.unwrap();

  let found = fx.students.find_by_id(s.user.id).await.unwrap().unwrap();
  assert_eq!(found.user.last_name, "Silva de León");
  assert_eq!(found.program, "Mathematics");
  assert_eq!(found.confidential_notes.len(), 2);
}

#[tokio::test]
async fn student_finders_filter_by_column() {
  let fx = fixture().await;
  let a = saved_student(&fx, "a@example.edu").await;
  let mut b = student("b@example.edu");
  b.program = "Law".into();
  b.cohort = "2023-B".into();
  b.health_system = "mutual".into();
  let b_id = fx.students.save(&b).await.unwrap();

  let cs = fx.students.find_by_program("CS").await.unwrap();
  assert_eq!(cs.len(), 1);
  assert_eq!(cs[0].user.id, a.user.id);

  let cohort = fx.students.find_by_cohort("2023-B").await.unwrap();
  assert_eq!(cohort.len(), 1);
  assert_eq!(cohort[0].user.id, b_id);

  let mutual = fx.students.find_by_health_system("mutual").await.unwrap();
  assert_eq!(mutual.len(), 1);
  assert_eq!(mutual[0].user.id, b_id);
}

#[tokio::test]
async fn student_update_phone() {
  let fx = fixture().await;
  let s = saved_student(&fx, "ana@example.edu").await;

  fx.students.update_phone(s.user.id, "098765432").await.unwrap();

  let found = fx.students.find_by_id(s.user.id).await.unwrap().unwrap();
  assert_eq!(found.phone, "098765432");
}

// ─── Logical deletion & discriminators ───────────────────────────────────────

#[tokio::test]
async fn logical_delete_hides_user_but_keeps_row() {
  let fx = fixture().await;
  let s = saved_student(&fx, "ana@example.edu").await;

  fx.students.delete(s.user.id).await.unwrap();

  // Invisible through the accessors...
  assert!(fx.users.find_by_id(s.user.id).await.unwrap().is_none());
  assert!(fx.students.find_by_id(s.user.id).await.unwrap().is_none());
  assert!(fx.students.find_all().await.unwrap().is_empty());

  // ...but both rows still physically exist.
  assert_eq!(count_rows(&fx.db, "users").await, 1);
  assert_eq!(count_rows(&fx.db, "students").await, 1);
  assert_eq!(raw_user_status(&fx.db, s.user.id).await, "INACTIVE");
}

#[tokio::test]
async fn subtype_accessors_reject_mismatched_kind() {
  let fx = fixture().await;
  let s = saved_student(&fx, "ana@example.edu").await;
  let f = saved_staff(&fx, "staff@example.edu", "advisor").await;

  assert!(fx.staff.find_by_id(s.user.id).await.unwrap().is_none());
  assert!(fx.students.find_by_id(f.user.id).await.unwrap().is_none());

  // The base accessor still sees both.
  assert!(fx.users.find_by_id(s.user.id).await.unwrap().is_some());
  assert!(fx.users.find_by_id(f.user.id).await.unwrap().is_some());
}

#[tokio::test]
async fn user_find_all_excludes_inactive() {
  let fx = fixture().await;
  let a = saved_student(&fx, "a@example.edu").await;
  saved_student(&fx, "b@example.edu").await;

  fx.users.delete_logical(a.user.id).await.unwrap();

  let all = fx.users.find_all().await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].email, "b@example.edu");
}

// ─── Staff ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn staff_round_trip_resolves_full_role() {
  let fx = fixture().await;
  let f = saved_staff(&fx, "staff@example.edu", "advisor").await;

  assert!(f.user.id > 0);
  assert_eq!(f.user.kind, UserKind::Staff);
  let role = f.role.unwrap();
  assert_eq!(role.name, "advisor");
  assert_eq!(role.permissions.len(), 1);
}

#[tokio::test]
async fn staff_save_without_role_is_a_precondition_failure() {
  let fx = fixture().await;

  let err = fx
    .staff
    .save(&Staff { user: user(UserKind::Staff, "staff@example.edu"), role: None })
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    Error::Core(pastoral_core::Error::StaffWithoutRole)
  ));
  assert_eq!(count_rows(&fx.db, "users").await, 0);
}

#[tokio::test]
async fn staff_save_rolls_back_base_row_on_specialization_failure() {
  let fx = fixture().await;

  // A role id that violates the staff table's foreign key: the base
  // insert succeeds, the specialization insert fails, and the whole
  // write must vanish.
  let ghost_role = Role { id: 9999, name: "ghost".into(), permissions: Vec::new() };
  let result = fx
    .staff
    .save(&Staff {
      user: user(UserKind::Staff, "staff@example.edu"),
      role: Some(ghost_role),
    })
    .await;

  assert!(result.is_err());
  assert_eq!(count_rows(&fx.db, "users").await, 0);
  assert_eq!(count_rows(&fx.db, "staff").await, 0);
}

#[tokio::test]
async fn staff_assign_role_and_find_by_role() {
  let fx = fixture().await;
  let f = saved_staff(&fx, "staff@example.edu", "advisor").await;
  let counselor = saved_role(&fx, "counselor").await;

  fx.staff.assign_role(f.user.id, counselor.id).await.unwrap();

  let found = fx.staff.find_by_id(f.user.id).await.unwrap().unwrap();
  assert_eq!(found.role.unwrap().name, "counselor");

  let by_role = fx.staff.find_by_role("counselor").await.unwrap();
  assert_eq!(by_role.len(), 1);
  assert_eq!(by_role[0].user.id, f.user.id);
  assert!(fx.staff.find_by_role("advisor").await.unwrap().is_empty());
}

// ─── Authentication paths ────────────────────────────────────────────────────

#[tokio::test]
async fn find_by_email_sees_inactive_rows_and_attaches_role() {
  let fx = fixture().await;
  let f = saved_staff(&fx, "staff@example.edu", "advisor").await;

  fx.staff.delete(f.user.id).await.unwrap();

  // Generic lookup: gone. Email lookup: still there, marked inactive,
  // with the role reference attached.
  assert!(fx.users.find_by_id(f.user.id).await.unwrap().is_none());
  let auth = fx
    .users
    .find_by_email("staff@example.edu")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(auth.user.status, UserStatus::Inactive);
  assert_eq!(auth.role.unwrap().name, "advisor");
}

#[tokio::test]
async fn find_by_email_leaves_role_empty_for_students() {
  let fx = fixture().await;
  saved_student(&fx, "ana@example.edu").await;

  let auth = fx.users.find_by_email("ana@example.edu").await.unwrap().unwrap();
  assert_eq!(auth.user.kind, UserKind::Student);
  assert!(auth.role.is_none());
}

#[tokio::test]
async fn validate_credentials_accepts_the_right_password() {
  let fx = fixture().await;
  saved_staff(&fx, "staff@example.edu", "advisor").await;

  let auth = fx
    .users
    .validate_credentials("staff@example.edu", "hunter2")
    .await
    .unwrap();
  assert_eq!(auth.user.email, "staff@example.edu");
}

#[tokio::test]
async fn validate_credentials_fails_uniformly() {
  let fx = fixture().await;
  let s = saved_student(&fx, "ana@example.edu").await;

  // Wrong password.
  let err = fx
    .users
    .validate_credentials("ana@example.edu", "wrong")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(pastoral_core::Error::AuthenticationFailed)
  ));

  // Unknown account: indistinguishable from the wrong password.
  let err = fx
    .users
    .validate_credentials("nobody@example.edu", "hunter2")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(pastoral_core::Error::AuthenticationFailed)
  ));

  // Inactive account with the correct password: same signal again.
  fx.users.delete_logical(s.user.id).await.unwrap();
  let err = fx
    .users
    .validate_credentials("ana@example.edu", "hunter2")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(pastoral_core::Error::AuthenticationFailed)
  ));
}

#[tokio::test]
async fn change_password_invalidates_the_old_one() {
  let fx = fixture().await;
  let s = saved_student(&fx, "ana@example.edu").await;

  fx.users.change_password(s.user.id, "new-secret").await.unwrap();

  assert!(fx
    .users
    .validate_credentials("ana@example.edu", "hunter2")
    .await
    .is_err());
  assert!(fx
    .users
    .validate_credentials("ana@example.edu", "new-secret")
    .await
    .is_ok());
}

#[tokio::test]
async fn view_non_sensitive_never_exposes_the_credential() {
  let fx = fixture().await;
  let s = saved_student(&fx, "ana@example.edu").await;

  let profile = fx.users.view_non_sensitive(s.user.id).await.unwrap().unwrap();
  assert_eq!(profile.email, "ana@example.edu");
  assert_eq!(profile.kind, UserKind::Student);

  // Still visible after logical deletion: the projection has no status
  // filter, it only narrows columns.
  fx.users.delete_logical(s.user.id).await.unwrap();
  let profile = fx.users.view_non_sensitive(s.user.id).await.unwrap().unwrap();
  assert_eq!(profile.status, UserStatus::Inactive);
}

#[tokio::test]
async fn validate_credentials_with_argon2_end_to_end() {
  let db = Db::open_in_memory().await.unwrap();
  let users = UserStore::new(&db, Arc::new(pastoral_auth::Argon2Hasher));
  let students = StudentStore::new(&db, users.clone());

  students.save(&student("ana@example.edu")).await.unwrap();

  let auth = users
    .validate_credentials("ana@example.edu", "hunter2")
    .await
    .unwrap();
  assert!(auth.user.credential.starts_with("$argon2"));
  assert!(users
    .validate_credentials("ana@example.edu", "wrong")
    .await
    .is_err());
}

// ─── Roles & permissions ─────────────────────────────────────────────────────

#[tokio::test]
async fn role_save_requires_at_least_one_permission() {
  let fx = fixture().await;

  let err = fx
    .roles
    .save(&Role { id: 0, name: "empty".into(), permissions: Vec::new() })
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    Error::Core(pastoral_core::Error::RoleWithoutPermissions)
  ));
  assert_eq!(count_rows(&fx.db, "roles").await, 0);
}

#[tokio::test]
async fn roles_find_all_distributes_overlapping_permissions() {
  let fx = fixture().await;

  let mut perms = Vec::new();
  for name in ["cases:view", "cases:edit", "students:view"] {
    let id = fx
      .permissions
      .save(&Permission { id: 0, name: name.into() })
      .await
      .unwrap();
    perms.push(Permission { id, name: name.into() });
  }

  let sets: [(&str, Vec<Permission>); 3] = [
    ("advisor", vec![perms[0].clone(), perms[2].clone()]),
    ("counselor", perms.clone()),
    ("auditor", vec![perms[0].clone()]),
  ];
  for (name, permissions) in &sets {
    fx.roles
      .save(&Role { id: 0, name: (*name).into(), permissions: permissions.clone() })
      .await
      .unwrap();
  }

  let mut roles = fx.roles.find_all().await.unwrap();
  roles.sort_by(|a, b| a.name.cmp(&b.name));
  assert_eq!(roles.len(), 3);

  let by_name = |name: &str| {
    roles
      .iter()
      .find(|role| role.name == name)
      .unwrap()
      .permissions
      .iter()
      .map(|p| p.name.clone())
      .collect::<Vec<_>>()
  };
  assert_eq!(by_name("advisor"), vec!["cases:view", "students:view"]);
  assert_eq!(by_name("counselor"), vec!["cases:view", "cases:edit", "students:view"]);
  assert_eq!(by_name("auditor"), vec!["cases:view"]);
}

#[tokio::test]
async fn role_update_replaces_the_association_set() {
  let fx = fixture().await;
  let mut role = saved_role(&fx, "advisor").await;
  let extra_id = fx
    .permissions
    .save(&Permission { id: 0, name: "reports:run".into() })
    .await
    .unwrap();

  role.name = "senior advisor".into();
  role.permissions = vec![Permission { id: extra_id, name: "reports:run".into() }];
  fx.roles.update(&role).await.unwrap();

  let found = fx.roles.find_by_id(role.id).await.unwrap().unwrap();
  assert_eq!(found.name, "senior advisor");
  assert_eq!(found.permissions.len(), 1);
  assert_eq!(found.permissions[0].name, "reports:run");
  assert_eq!(count_rows(&fx.db, "role_permissions").await, 1);
}

#[tokio::test]
async fn add_permission_validates_every_precondition() {
  let fx = fixture().await;
  let role = saved_role(&fx, "advisor").await;
  let assigned = role.permissions[0].id;

  let err = fx.roles.add_permission(404, assigned).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(pastoral_core::Error::RoleNotFound(404))
  ));

  let err = fx.roles.add_permission(role.id, 404).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(pastoral_core::Error::PermissionNotFound(404))
  ));

  let err = fx.roles.add_permission(role.id, assigned).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(pastoral_core::Error::PermissionAlreadyAssigned { .. })
  ));

  let new_id = fx
    .permissions
    .save(&Permission { id: 0, name: "reports:run".into() })
    .await
    .unwrap();
  fx.roles.add_permission(role.id, new_id).await.unwrap();

  let found = fx.roles.find_by_id(role.id).await.unwrap().unwrap();
  assert_eq!(found.permissions.len(), 2);
}

#[tokio::test]
async fn remove_permission_validates_assignment_state() {
  let fx = fixture().await;
  let role = saved_role(&fx, "advisor").await;
  let unassigned_id = fx
    .permissions
    .save(&Permission { id: 0, name: "reports:run".into() })
    .await
    .unwrap();

  let err = fx
    .roles
    .remove_permission(role.id, unassigned_id)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(pastoral_core::Error::PermissionNotAssigned { .. })
  ));

  fx.roles
    .remove_permission(role.id, role.permissions[0].id)
    .await
    .unwrap();
  let found = fx.roles.find_by_id(role.id).await.unwrap().unwrap();
  assert!(found.permissions.is_empty());
}

#[tokio::test]
async fn role_has_staff_tracks_assignment() {
  let fx = fixture().await;
  let role = saved_role(&fx, "advisor").await;
  assert!(!fx.roles.has_staff(role.id).await.unwrap());

  let staff_id = fx
    .staff
    .save(&Staff {
      user: user(UserKind::Staff, "staff@example.edu"),
      role: Some(role.clone()),
    })
    .await
    .unwrap();
  assert!(fx.roles.has_staff(role.id).await.unwrap());

  // Logical deletion keeps the staff row, so the guard still holds.
  fx.staff.delete(staff_id).await.unwrap();
  assert!(fx.roles.has_staff(role.id).await.unwrap());
}

#[tokio::test]
async fn role_delete_is_physical_and_clears_associations() {
  let fx = fixture().await;
  let role = saved_role(&fx, "advisor").await;

  fx.roles.delete(role.id).await.unwrap();

  assert!(fx.roles.find_by_id(role.id).await.unwrap().is_none());
  assert_eq!(count_rows(&fx.db, "roles").await, 0);
  assert_eq!(count_rows(&fx.db, "role_permissions").await, 0);
  // The permissions themselves are untouched.
  assert_eq!(count_rows(&fx.db, "permissions").await, 1);
}

#[tokio::test]
async fn role_find_by_name() {
  let fx = fixture().await;
  let role = saved_role(&fx, "advisor").await;

  let found = fx.roles.find_by_name("advisor").await.unwrap().unwrap();
  assert_eq!(found.id, role.id);
  assert_eq!(found.permissions.len(), 1);
  assert!(fx.roles.find_by_name("nobody").await.unwrap().is_none());
}

// ─── Categories & permissions CRUD ───────────────────────────────────────────

#[tokio::test]
async fn category_crud_cycle() {
  let fx = fixture().await;
  let mut category = saved_category(&fx, "attendance").await;
  assert!(category.id > 0);

  category.description = "attendance and punctuality".into();
  fx.categories.update(&category).await.unwrap();
  let found = fx.categories.find_by_id(category.id).await.unwrap().unwrap();
  assert_eq!(found.description, "attendance and punctuality");

  assert_eq!(fx.categories.find_all().await.unwrap().len(), 1);

  fx.categories.delete(category.id).await.unwrap();
  assert!(fx.categories.find_by_id(category.id).await.unwrap().is_none());
  assert!(fx.categories.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn permission_crud_cycle() {
  let fx = fixture().await;
  let id = fx
    .permissions
    .save(&Permission { id: 0, name: "cases:view".into() })
    .await
    .unwrap();

  let mut permission = fx.permissions.find_by_id(id).await.unwrap().unwrap();
  permission.name = "cases:read".into();
  fx.permissions.update(&permission).await.unwrap();
  assert_eq!(
    fx.permissions.find_by_id(id).await.unwrap().unwrap().name,
    "cases:read"
  );

  fx.permissions.delete(id).await.unwrap();
  assert!(fx.permissions.find_by_id(id).await.unwrap().is_none());
}

// ─── Cases ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn common_case_round_trip_resolves_relations() {
  let fx = fixture().await;
  let common = saved_common(&fx, "one").await;

  assert!(common.case.id > 0);
  assert_eq!(common.case.kind, CaseKind::Common);
  assert!(!common.case.confidential);
  assert_eq!(common.motivation, "wants tutoring support");
  assert_eq!(common.case.category.name, "category-one");
  assert_eq!(common.case.student.user.email, "student-one@example.edu");
  assert_eq!(common.case.creator.user.email, "staff-one@example.edu");
  // Case reads reconstruct the creator as a staff shell only.
  assert!(common.case.creator.role.is_none());
}

#[tokio::test]
async fn incident_round_trip_resolves_reporter_and_list() {
  let fx = fixture().await;
  let category = saved_category(&fx, "conduct").await;
  let student = saved_student(&fx, "student@example.edu").await;
  let creator = saved_staff(&fx, "creator@example.edu", "advisor").await;
  let reporter = saved_staff(&fx, "reporter@example.edu", "counselor").await;

  let id = fx
    .incidents
    .save(&Incident {
      case:     case_record(CaseKind::Incident, category, student, creator),
      location: "library".into(),
      involved: vec!["J. Pérez".into(), "M. García".into()],
      reporter: reporter.clone(),
    })
    .await
    .unwrap();

  let found = fx.incidents.find_by_id(id).await.unwrap().unwrap();
  assert_eq!(found.case.kind, CaseKind::Incident);
  assert!(found.case.confidential);
  assert_eq!(found.location, "library");
  assert_eq!(found.involved, vec!["J. Pérez".to_string(), "M. García".to_string()]);
  assert_eq!(found.reporter.user.id, reporter.user.id);
}

#[tokio::test]
async fn subtype_case_accessors_reject_mismatched_kind() {
  let fx = fixture().await;
  let common = saved_common(&fx, "one").await;

  // The incident accessor must never hand back a malformed incident for
  // a common-case id.
  assert!(fx.incidents.find_by_id(common.case.id).await.unwrap().is_none());
  assert!(fx.commons.find_by_id(common.case.id).await.unwrap().is_some());
}

#[tokio::test]
async fn case_find_all_filters_by_kind_client_side() {
  let fx = fixture().await;
  let common = saved_common(&fx, "one").await;
  let reporter = saved_staff(&fx, "reporter@example.edu", "counselor").await;
  fx.incidents
    .save(&Incident {
      case:     case_record(
        CaseKind::Incident,
        common.case.category.clone(),
        common.case.student.clone(),
        reporter.clone(),
      ),
      location: "hallway".into(),
      involved: Vec::new(),
      reporter,
    })
    .await
    .unwrap();

  assert_eq!(fx.cases.find_all().await.unwrap().len(), 2);
  assert_eq!(fx.commons.find_all().await.unwrap().len(), 1);
  assert_eq!(fx.incidents.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn case_finders_filter_by_student_and_category() {
  let fx = fixture().await;
  let one = saved_common(&fx, "one").await;
  let two = saved_common(&fx, "two").await;

  let by_student = fx
    .cases
    .find_by_student(one.case.student.user.id)
    .await
    .unwrap();
  assert_eq!(by_student.len(), 1);
  assert_eq!(by_student[0].id, one.case.id);

  let by_category = fx
    .cases
    .find_by_category(two.case.category.id)
    .await
    .unwrap();
  assert_eq!(by_category.len(), 1);
  assert_eq!(by_category[0].id, two.case.id);
}

#[tokio::test]
async fn incident_save_rolls_back_on_bad_reporter() {
  let fx = fixture().await;
  let category = saved_category(&fx, "conduct").await;
  let student = saved_student(&fx, "student@example.edu").await;
  let creator = saved_staff(&fx, "creator@example.edu", "advisor").await;

  // A reporter id with no user row behind it: the base insert succeeds,
  // the specialization insert violates its foreign key.
  let mut ghost_user = user(UserKind::Staff, "ghost@example.edu");
  ghost_user.id = 9999;
  let ghost = Staff { user: ghost_user, role: None };

  let result = fx
    .incidents
    .save(&Incident {
      case:     case_record(CaseKind::Incident, category, student, creator),
      location: "library".into(),
      involved: Vec::new(),
      reporter: ghost,
    })
    .await;

  assert!(result.is_err());
  assert_eq!(count_rows(&fx.db, "cases").await, 0);
  assert_eq!(count_rows(&fx.db, "incidents").await, 0);
}

#[tokio::test]
async fn incident_involved_delimiter_is_rejected_before_writing() {
  let fx = fixture().await;
  let category = saved_category(&fx, "conduct").await;
  let student = saved_student(&fx, "student@example.edu").await;
  let creator = saved_staff(&fx, "creator@example.edu", "advisor").await;

  let err = fx
    .incidents
    .save(&Incident {
      case:     case_record(CaseKind::Incident, category, student, creator.clone()),
      location: "library".into(),
      involved: vec!["Pérez, Juan".into()],
      reporter: creator,
    })
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    Error::Core(pastoral_core::Error::DelimiterInValue(_))
  ));
  assert_eq!(count_rows(&fx.db, "cases").await, 0);
}

#[tokio::test]
async fn case_update_rewrites_both_tables() {
  let fx = fixture().await;
  let mut common = saved_common(&fx, "one").await;

  common.case.title = "pattern of missed sessions".into();
  common.case.calendar_event_id = Some("evt_4417".into());
  common.motivation = "weekly tutoring".into();
  fx.commons.update(&common).await.unwrap();

  let found = fx.commons.find_by_id(common.case.id).await.unwrap().unwrap();
  assert_eq!(found.case.title, "pattern of missed sessions");
  assert_eq!(found.case.calendar_event_id.as_deref(), Some("evt_4417"));
  assert_eq!(found.motivation, "weekly tutoring");
}

#[tokio::test]
async fn case_delete_is_physical_and_cascades() {
  let fx = fixture().await;
  let common = saved_common(&fx, "one").await;

  fx.commons.delete(common.case.id).await.unwrap();

  assert!(fx.cases.find_by_id(common.case.id).await.unwrap().is_none());
  assert_eq!(count_rows(&fx.db, "cases").await, 0);
  assert_eq!(count_rows(&fx.db, "common_cases").await, 0);
  // The student behind the case is untouched.
  assert_eq!(count_rows(&fx.db, "users").await, 2);
}

#[tokio::test]
async fn case_with_deactivated_student_fails_to_resolve() {
  let fx = fixture().await;
  let common = saved_common(&fx, "one").await;

  // The student is only logically deleted, but that makes the relation
  // unresolvable — and a case without its relations is not valid data.
  fx.students.delete(common.case.student.user.id).await.unwrap();

  let err = fx.cases.find_by_id(common.case.id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::MissingRelation { relation: "student", .. }
  ));
}

#[tokio::test]
async fn empty_find_all_returns_empty_vectors() {
  let fx = fixture().await;
  assert!(fx.users.find_all().await.unwrap().is_empty());
  assert!(fx.students.find_all().await.unwrap().is_empty());
  assert!(fx.staff.find_all().await.unwrap().is_empty());
  assert!(fx.roles.find_all().await.unwrap().is_empty());
  assert!(fx.cases.find_all().await.unwrap().is_empty());
}

// ─── Configuration ───────────────────────────────────────────────────────────

#[tokio::test]
async fn config_file_opens_an_on_disk_store() {
  let dir = tempfile::tempdir().unwrap();
  let config_path = dir.path().join("store.toml");
  let db_path = dir.path().join("pastoral.sqlite3");
  std::fs::write(&config_path, format!("store_path = {db_path:?}\n")).unwrap();

  let config = DbConfig::load(&config_path).unwrap();
  assert_eq!(config.store_path, db_path);

  let db = Db::from_config(&config).await.unwrap();
  assert_eq!(count_rows(&db, "users").await, 0);
  assert!(db_path.exists());
}
