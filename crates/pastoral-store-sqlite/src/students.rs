//! [`StudentStore`] — the accessor for the student specialization.
//!
//! Writes compose the base-row statement (through the user accessor's row
//! helpers) and the specialization statement inside one transaction, so a
//! failure in either leaves no partial user. Reads delegate to
//! [`UserStore`] for the base projection, check the discriminator, then
//! merge in the specialization row.

use pastoral_core::{
  store::RecordStore,
  user::{Student, User, UserKind},
};
use rusqlite::OptionalExtension as _;

use crate::{
  db::Db,
  encode::{decode_date, decode_list, encode_date, encode_list},
  users::{self, UserStore},
  Result,
};

/// Specialization columns of one `students` row, still in stored form.
struct RawStudentRow {
  referral_reason:    String,
  program:            String,
  cohort:             String,
  phone:              String,
  street:             String,
  door_number:        String,
  birth_date:         String,
  photo:              Option<String>,
  health_system:      String,
  general_comments:   String,
  health_status:      String,
  confidential_notes: String,
}

impl RawStudentRow {
  fn into_student(self, user: User) -> Result<Student> {
    Ok(Student {
      user,
      referral_reason:    self.referral_reason,
      program:            self.program,
      cohort:             self.cohort,
      phone:              self.phone,
      street:             self.street,
      door_number:        self.door_number,
      birth_date:         decode_date(&self.birth_date)?,
      photo:              self.photo,
      health_system:      self.health_system,
      general_comments:   self.general_comments,
      health_status:      self.health_status,
      confidential_notes: decode_list(&self.confidential_notes),
    })
  }
}

fn insert_student_row(
  conn: &rusqlite::Connection,
  id: i64,
  student: &Student,
  notes: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO students (id, referral_reason, program, cohort, phone, street,
                           door_number, birth_date, photo, health_system,
                           general_comments, health_status, confidential_notes)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    rusqlite::params![
      id,
      student.referral_reason,
      student.program,
      student.cohort,
      student.phone,
      student.street,
      student.door_number,
      encode_date(student.birth_date),
      student.photo,
      student.health_system,
      student.general_comments,
      student.health_status,
      notes,
    ],
  )?;
  Ok(())
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct StudentStore {
  conn:  tokio_rusqlite::Connection,
  users: UserStore,
}

impl StudentStore {
  pub fn new(db: &Db, users: UserStore) -> Self {
    Self { conn: db.connection(), users }
  }

  /// Active students in a given program.
  pub async fn find_by_program(&self, program: &str) -> Result<Vec<Student>> {
    self
      .collect_by(
        "SELECT u.id FROM users u JOIN students s ON u.id = s.id
         WHERE s.program = ?1 AND u.kind = 'STUDENT' AND u.status = 'ACTIVE'",
        program.to_owned(),
      )
      .await
  }

  /// Active students in a given cohort.
  pub async fn find_by_cohort(&self, cohort: &str) -> Result<Vec<Student>> {
    self
      .collect_by(
        "SELECT u.id FROM users u JOIN students s ON u.id = s.id
         WHERE s.cohort = ?1 AND u.kind = 'STUDENT' AND u.status = 'ACTIVE'",
        cohort.to_owned(),
      )
      .await
  }

  /// Active students covered by a given health system.
  pub async fn find_by_health_system(&self, system: &str) -> Result<Vec<Student>> {
    self
      .collect_by(
        "SELECT u.id FROM users u JOIN students s ON u.id = s.id
         WHERE s.health_system = ?1 AND u.kind = 'STUDENT' AND u.status = 'ACTIVE'",
        system.to_owned(),
      )
      .await
  }

  /// Rewrite just the phone column.
  pub async fn update_phone(&self, id: i64, phone: &str) -> Result<()> {
    let phone = phone.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE students SET phone = ?1 WHERE id = ?2",
          rusqlite::params![phone, id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run an id-list query, then reconstruct each student individually —
  /// one lookup per row, same shape as the other hierarchy walks.
  async fn collect_by(&self, sql: &'static str, param: String) -> Result<Vec<Student>> {
    let ids: Vec<i64> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(rusqlite::params![param], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut students = Vec::with_capacity(ids.len());
    for id in ids {
      if let Some(student) = self.find_by_id(id).await? {
        students.push(student);
      }
    }
    Ok(students)
  }

  async fn specialization_row(&self, id: i64) -> Result<Option<RawStudentRow>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT referral_reason, program, cohort, phone, street, door_number,
                      birth_date, photo, health_system, general_comments,
                      health_status, confidential_notes
               FROM students WHERE id = ?1",
              rusqlite::params![id],
              |row| {
                Ok(RawStudentRow {
                  referral_reason:    row.get(0)?,
                  program:            row.get(1)?,
                  cohort:             row.get(2)?,
                  phone:              row.get(3)?,
                  street:             row.get(4)?,
                  door_number:        row.get(5)?,
                  birth_date:         row.get(6)?,
                  photo:              row.get(7)?,
                  health_system:      row.get(8)?,
                  general_comments:   row.get(9)?,
                  health_status:      row.get(10)?,
                  confidential_notes: row.get(11)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw)
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for StudentStore {
  type Entity = Student;
  type Error = crate::Error;

  /// One transaction: base insert, then the specialization insert keyed by
  /// the generated id. Either failing rolls the whole write back.
  async fn save(&self, student: &Student) -> Result<i64> {
    let digest = self.users.hasher().hash(&student.user.credential)?;
    let notes = encode_list(&student.confidential_notes)?;
    let student = student.clone();

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id = users::insert_user_row(&tx, &student.user, &digest)?;
        insert_student_row(&tx, id, &student, &notes)?;
        tx.commit()?;
        Ok(id)
      })
      .await?;

    tracing::debug!(id, "student saved");
    Ok(id)
  }

  /// Delegate the base lookup (active rows only), check the discriminator,
  /// then merge in the specialization row. A staff row under this id is
  /// `None`, not an error.
  async fn find_by_id(&self, id: i64) -> Result<Option<Student>> {
    let Some(user) = self.users.find_by_id(id).await? else {
      return Ok(None);
    };
    if user.kind != UserKind::Student {
      return Ok(None);
    }
    let Some(raw) = self.specialization_row(id).await? else {
      return Ok(None);
    };
    Ok(Some(raw.into_student(user)?))
  }

  async fn find_all(&self) -> Result<Vec<Student>> {
    let ids: Vec<i64> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT u.id FROM users u JOIN students s ON u.id = s.id
           WHERE u.kind = 'STUDENT' AND u.status = 'ACTIVE'",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut students = Vec::with_capacity(ids.len());
    for id in ids {
      if let Some(student) = self.find_by_id(id).await? {
        students.push(student);
      }
    }
    Ok(students)
  }

  /// The same two-table pattern as `save`, under one transaction.
  async fn update(&self, student: &Student) -> Result<()> {
    let notes = encode_list(&student.confidential_notes)?;
    let student = student.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        users::update_user_row(&tx, &student.user)?;
        tx.execute(
          "UPDATE students
           SET referral_reason = ?1, program = ?2, cohort = ?3, phone = ?4,
               street = ?5, door_number = ?6, birth_date = ?7, photo = ?8,
               health_system = ?9, general_comments = ?10, health_status = ?11,
               confidential_notes = ?12
           WHERE id = ?13",
          rusqlite::params![
            student.referral_reason,
            student.program,
            student.cohort,
            student.phone,
            student.street,
            student.door_number,
            encode_date(student.birth_date),
            student.photo,
            student.health_system,
            student.general_comments,
            student.health_status,
            notes,
            student.user.id,
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Logical, delegated wholly to the base accessor. The specialization
  /// row stays behind as a tombstone.
  async fn delete(&self, id: i64) -> Result<()> {
    self.users.delete_logical(id).await
  }
}
