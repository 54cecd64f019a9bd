use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lakeside_core::{
    Booking, BookingRoom, BookingStatus, BookingWrite, GuestInfo, HoldPolicy, HotelRepository, NewBooking, Payment,
    PaymentStatus, PaymentWrite, PriceTable, Room, RoomHold, RoomStatus, RoomType, SeasonalPricing, StoreError,
};
use sqlx::postgres::PgDatabaseError;
use sqlx::{PgConnection, PgPool};
use std::str::FromStr;
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const EXCLUSION_VIOLATION: &str = "23P01";
const SERIALIZATION_FAILURE: &str = "40001";

const BOOKING_NUMBER_KEY: &str = "bookings_booking_number_key";
const PAYMENT_REFERENCE_KEY: &str = "payments_reference_key";

const BOOKING_COLUMNS: &str = "id, booking_number, guest_name, guest_email, guest_phone, guest_region, nationality, \
     special_requests, check_in, check_out, adults, children, occupancy, total_amount, paid_amount, currency, \
     status, payment_method, version, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, booking_id, amount, credited_amount, method, status, reference, gateway_receipt, \
     payer_phone, created_at, updated_at";

pub struct PostgresHotelRepository {
    pool: PgPool,
}

impl PostgresHotelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Recompute `booking_rooms.holds_inventory` under `policy`.
    ///
    /// The flag is stamped with the policy in force when a row is written, so
    /// a changed policy has to be applied here before serving. Switching to a
    /// stricter policy fails with `RoomConflict` if stored PENDING stays
    /// already overlap; those bookings need resolving first.
    pub async fn apply_hold_policy(&self, policy: HoldPolicy) -> Result<u64, StoreError> {
        let statuses: Vec<&str> = policy.blocking_statuses().iter().map(|s| s.as_str()).collect();
        let result = sqlx::query(
            "UPDATE booking_rooms br SET holds_inventory = (b.status = ANY($1)) \
             FROM bookings b \
             WHERE b.id = br.booking_id AND br.holds_inventory <> (b.status = ANY($1))",
        )
        .bind(statuses)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected()),
            Err(e) if db_code(&e).as_deref() == Some(EXCLUSION_VIOLATION) => {
                match exclusion_detail(&e).as_deref().and_then(room_from_exclusion_detail) {
                    Some(room_id) => Err(StoreError::RoomConflict { room_id }),
                    None => Err(backend(e)),
                }
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn begin_serializable(&self) -> Result<sqlx::Transaction<'static, sqlx::Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn load_booking(&self, row: BookingRow) -> Result<Booking, StoreError> {
        let lines = sqlx::query_as::<_, BookingRoomRow>(
            "SELECT id, booking_id, room_id, room_number, room_type_id, rate_per_night, nights, total_price \
             FROM booking_rooms WHERE booking_id = $1 ORDER BY room_number",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        row.into_booking(lines.into_iter().map(BookingRoom::from).collect())
    }

    async fn write_new_booking(&self, new_booking: &NewBooking, policy: HoldPolicy) -> Result<(), Abort> {
        let booking = &new_booking.booking;
        let holds = policy.holds_inventory(booking.status);
        let mut tx = self.begin_serializable().await?;

        if holds {
            if let Some(room_id) = overlapping_room(&mut tx, booking).await? {
                return Err(Abort::Store(StoreError::RoomConflict { room_id }));
            }
        }

        sqlx::query(&format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)"
        ))
        .bind(booking.id)
        .bind(&booking.booking_number)
        .bind(&booking.guest.full_name)
        .bind(booking.guest.email.expose().as_str())
        .bind(booking.guest.phone.expose().as_str())
        .bind(booking.guest.region.as_str())
        .bind(booking.guest.nationality.as_deref())
        .bind(booking.guest.special_requests.as_deref())
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(booking.adults as i32)
        .bind(booking.children as i32)
        .bind(booking.occupancy.as_str())
        .bind(booking.total_amount)
        .bind(booking.paid_amount)
        .bind(&booking.currency)
        .bind(booking.status.as_str())
        .bind(booking.payment_method.map(|m| m.as_str()))
        .bind(booking.version)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_lines(&mut tx, booking, holds).await?;

        if let Some(payment) = &new_booking.initial_payment {
            insert_payment_row(&mut tx, payment).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn write_booking_update(&self, write: &BookingWrite, policy: HoldPolicy, updated_at: DateTime<Utc>) -> Result<(), Abort> {
        let booking = &write.booking;
        let holds = policy.holds_inventory(booking.status);
        let mut tx = self.begin_serializable().await?;

        let stored: Option<i64> = sqlx::query_scalar("SELECT version FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(booking.id)
            .fetch_optional(&mut *tx)
            .await?;
        match stored {
            None => return Err(Abort::Store(StoreError::BookingNotFound(booking.id))),
            Some(version) if version != booking.version => {
                return Err(Abort::Store(StoreError::VersionConflict { booking_id: booking.id }))
            }
            Some(_) => {}
        }

        if holds {
            if let Some(room_id) = overlapping_room(&mut tx, booking).await? {
                return Err(Abort::Store(StoreError::RoomConflict { room_id }));
            }
        }

        sqlx::query(
            "UPDATE bookings SET check_in = $2, check_out = $3, occupancy = $4, total_amount = $5, \
             paid_amount = $6, status = $7, payment_method = $8, version = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(booking.id)
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(booking.occupancy.as_str())
        .bind(booking.total_amount)
        .bind(booking.paid_amount)
        .bind(booking.status.as_str())
        .bind(booking.payment_method.map(|m| m.as_str()))
        .bind(booking.version + 1)
        .bind(updated_at)
        .execute(&mut *tx)
        .await?;

        if write.replace_rooms {
            sqlx::query("DELETE FROM booking_rooms WHERE booking_id = $1")
                .bind(booking.id)
                .execute(&mut *tx)
                .await?;
            insert_lines(&mut tx, booking, holds).await?;
        } else {
            sqlx::query("UPDATE booking_rooms SET holds_inventory = $2 WHERE booking_id = $1")
                .bind(booking.id)
                .bind(holds)
                .execute(&mut *tx)
                .await?;
        }

        match &write.payment {
            Some(PaymentWrite::Insert(payment)) => insert_payment_row(&mut tx, payment).await?,
            Some(PaymentWrite::Transition { payment, expected_status }) => {
                if !update_payment_row(&mut tx, payment, *expected_status).await? {
                    return Err(Abort::Store(StoreError::PaymentStateChanged { payment_id: payment.id }));
                }
            }
            None => {}
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl HotelRepository for PostgresHotelRepository {
    async fn get_room_type(&self, id: Uuid) -> Result<Option<RoomType>, StoreError> {
        let row = sqlx::query_as::<_, RoomTypeRow>(
            "SELECT id, name, description, single_domestic, double_domestic, single_international, \
             double_international, max_occupancy, amenities, images, is_active FROM room_types WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(RoomType::from))
    }

    async fn list_room_types(&self) -> Result<Vec<RoomType>, StoreError> {
        let rows = sqlx::query_as::<_, RoomTypeRow>(
            "SELECT id, name, description, single_domestic, double_domestic, single_international, \
             double_international, max_occupancy, amenities, images, is_active FROM room_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(RoomType::from).collect())
    }

    async fn get_room(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query_as::<_, RoomRow>(
            "SELECT id, room_number, floor, room_type_id, status, is_active FROM rooms WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Room::try_from).transpose()
    }

    async fn list_rooms(&self, room_type_id: Option<Uuid>) -> Result<Vec<Room>, StoreError> {
        let rows = sqlx::query_as::<_, RoomRow>(
            "SELECT id, room_number, floor, room_type_id, status, is_active FROM rooms \
             WHERE is_active AND ($1::uuid IS NULL OR room_type_id = $1) ORDER BY floor, room_number",
        )
        .bind(room_type_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(Room::try_from).collect()
    }

    async fn set_room_status(&self, room_ids: &[Uuid], status: RoomStatus) -> Result<(), StoreError> {
        sqlx::query("UPDATE rooms SET status = $1 WHERE id = ANY($2)")
            .bind(status.as_str())
            .bind(room_ids)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list_seasonal_pricing(
        &self,
        room_type_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SeasonalPricing>, StoreError> {
        let rows = sqlx::query_as::<_, SeasonalPricingRow>(
            "SELECT id, room_type_id, name, start_date, end_date, fixed_price, multiplier, is_active, created_at \
             FROM seasonal_pricing \
             WHERE room_type_id = $1 AND is_active AND start_date < $3 AND end_date >= $2",
        )
        .bind(room_type_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(SeasonalPricing::from).collect())
    }

    async fn list_room_holds(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        statuses: &[BookingStatus],
    ) -> Result<Vec<RoomHold>, StoreError> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let rows: Vec<(Uuid, Uuid, NaiveDate, NaiveDate, String)> = sqlx::query_as(
            "SELECT br.room_id, b.id, b.check_in, b.check_out, b.status \
             FROM booking_rooms br JOIN bookings b ON b.id = br.booking_id \
             WHERE b.check_in < $2 AND b.check_out > $1 AND b.status = ANY($3)",
        )
        .bind(check_in)
        .bind(check_out)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|(room_id, booking_id, check_in, check_out, status)| -> Result<RoomHold, StoreError> {
                Ok(RoomHold { room_id, booking_id, check_in, check_out, status: parse(&status)? })
            })
            .collect()
    }

    async fn insert_booking(&self, new_booking: NewBooking, policy: HoldPolicy) -> Result<Booking, StoreError> {
        match self.write_new_booking(&new_booking, policy).await {
            Ok(()) => Ok(new_booking.booking),
            Err(abort) => Err(abort.into_store_error(&new_booking.booking, new_booking.initial_payment.as_ref())),
        }
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => Ok(Some(self.load_booking(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_booking_by_number(&self, booking_number: &str) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_number = $1"
        ))
        .bind(booking_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => Ok(Some(self.load_booking(row).await?)),
            None => Ok(None),
        }
    }

    async fn update_booking(&self, write: BookingWrite, policy: HoldPolicy) -> Result<Booking, StoreError> {
        let updated_at = Utc::now();
        let payment = match &write.payment {
            Some(PaymentWrite::Insert(p)) | Some(PaymentWrite::Transition { payment: p, .. }) => Some(p),
            None => None,
        };

        match self.write_booking_update(&write, policy, updated_at).await {
            Ok(()) => {
                let mut booking = write.booking;
                booking.version += 1;
                booking.updated_at = updated_at;
                Ok(booking)
            }
            Err(abort) => Err(abort.into_store_error(&write.booking, payment)),
        }
    }

    async fn insert_payment(&self, payment: Payment) -> Result<Payment, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        match insert_payment_row(&mut conn, &payment).await {
            Ok(()) => Ok(payment),
            Err(e) => Err(match db_code(&e).as_deref() {
                Some(FOREIGN_KEY_VIOLATION) => StoreError::BookingNotFound(payment.booking_id),
                Some(UNIQUE_VIOLATION) => StoreError::DuplicateReference(payment.reference.clone().unwrap_or_default()),
                _ => backend(e),
            }),
        }
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Payment::try_from).transpose()
    }

    async fn list_payments(&self, booking_id: Uuid) -> Result<Vec<Payment>, StoreError> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = $1 ORDER BY created_at"
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn transition_payment(
        &self,
        payment: Payment,
        expected_status: PaymentStatus,
    ) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        update_payment_row(&mut conn, &payment, expected_status)
            .await
            .map_err(backend)
    }
}

/// Why a write transaction stopped: a checked rule or a database error.
enum Abort {
    Store(StoreError),
    Db(sqlx::Error),
}

impl From<sqlx::Error> for Abort {
    fn from(e: sqlx::Error) -> Self {
        Abort::Db(e)
    }
}

impl Abort {
    fn into_store_error(self, booking: &Booking, payment: Option<&Payment>) -> StoreError {
        let e = match self {
            Abort::Store(e) => return e,
            Abort::Db(e) => e,
        };

        match db_code(&e).as_deref() {
            Some(EXCLUSION_VIOLATION) => {
                let room_id = exclusion_detail(&e)
                    .and_then(|detail| room_from_exclusion_detail(&detail))
                    .or_else(|| booking.rooms.first().map(|line| line.room_id));
                match room_id {
                    Some(room_id) => StoreError::RoomConflict { room_id },
                    None => backend(e),
                }
            }
            Some(SERIALIZATION_FAILURE) => StoreError::VersionConflict { booking_id: booking.id },
            Some(UNIQUE_VIOLATION) => match constraint(&e).as_deref() {
                Some(BOOKING_NUMBER_KEY) => StoreError::DuplicateBookingNumber(booking.booking_number.clone()),
                Some(PAYMENT_REFERENCE_KEY) => {
                    StoreError::DuplicateReference(payment.and_then(|p| p.reference.clone()).unwrap_or_default())
                }
                _ => backend(e),
            },
            _ => backend(e),
        }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn db_code(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn constraint(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db.constraint().map(str::to_string),
        _ => None,
    }
}

fn exclusion_detail(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db
            .try_downcast_ref::<PgDatabaseError>()
            .and_then(|pg| pg.detail())
            .map(str::to_string),
        _ => None,
    }
}

/// Pulls the room id out of `Key (room_id, daterange(...))=(<uuid>, [..)) conflicts with ...`.
fn room_from_exclusion_detail(detail: &str) -> Option<Uuid> {
    let start = detail.find(")=(")? + 3;
    let candidate = detail.get(start..start + 36)?;
    Uuid::parse_str(candidate).ok()
}

fn parse<T: FromStr<Err = String>>(value: &str) -> Result<T, StoreError> {
    value.parse().map_err(StoreError::Backend)
}

async fn overlapping_room(conn: &mut PgConnection, booking: &Booking) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT room_id FROM booking_rooms \
         WHERE holds_inventory AND booking_id <> $1 AND room_id = ANY($2) \
         AND daterange(check_in, check_out, '[)') && daterange($3, $4, '[)') \
         LIMIT 1",
    )
    .bind(booking.id)
    .bind(booking.room_ids())
    .bind(booking.check_in)
    .bind(booking.check_out)
    .fetch_optional(conn)
    .await
}

async fn insert_lines(conn: &mut PgConnection, booking: &Booking, holds: bool) -> Result<(), sqlx::Error> {
    for line in &booking.rooms {
        sqlx::query(
            "INSERT INTO booking_rooms (id, booking_id, room_id, room_number, room_type_id, rate_per_night, \
             nights, total_price, check_in, check_out, holds_inventory) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(line.id)
        .bind(booking.id)
        .bind(line.room_id)
        .bind(&line.room_number)
        .bind(line.room_type_id)
        .bind(line.rate_per_night)
        .bind(line.nights)
        .bind(line.total_price)
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(holds)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_payment_row(conn: &mut PgConnection, payment: &Payment) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO payments ({PAYMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
    ))
    .bind(payment.id)
    .bind(payment.booking_id)
    .bind(payment.amount)
    .bind(payment.credited_amount)
    .bind(payment.method.as_str())
    .bind(payment.status.as_str())
    .bind(payment.reference.as_deref())
    .bind(payment.gateway_receipt.as_deref())
    .bind(payment.payer_phone.as_deref())
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Returns `false` when the stored row is no longer in `expected_status`.
async fn update_payment_row(
    conn: &mut PgConnection,
    payment: &Payment,
    expected_status: PaymentStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET amount = $3, credited_amount = $4, status = $5, gateway_receipt = $6, \
         payer_phone = $7, updated_at = $8 WHERE id = $1 AND status = $2",
    )
    .bind(payment.id)
    .bind(expected_status.as_str())
    .bind(payment.amount)
    .bind(payment.credited_amount)
    .bind(payment.status.as_str())
    .bind(payment.gateway_receipt.as_deref())
    .bind(payment.payer_phone.as_deref())
    .bind(payment.updated_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct RoomTypeRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    single_domestic: i64,
    double_domestic: i64,
    single_international: i64,
    double_international: i64,
    max_occupancy: i32,
    amenities: Vec<String>,
    images: Vec<String>,
    is_active: bool,
}

impl From<RoomTypeRow> for RoomType {
    fn from(row: RoomTypeRow) -> Self {
        RoomType {
            id: row.id,
            name: row.name,
            description: row.description,
            prices: PriceTable {
                single_domestic: row.single_domestic,
                double_domestic: row.double_domestic,
                single_international: row.single_international,
                double_international: row.double_international,
            },
            max_occupancy: row.max_occupancy.max(0) as u32,
            amenities: row.amenities,
            images: row.images,
            is_active: row.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: Uuid,
    room_number: String,
    floor: i32,
    room_type_id: Uuid,
    status: String,
    is_active: bool,
}

impl TryFrom<RoomRow> for Room {
    type Error = StoreError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        Ok(Room {
            id: row.id,
            room_number: row.room_number,
            floor: row.floor,
            room_type_id: row.room_type_id,
            status: parse(&row.status)?,
            is_active: row.is_active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SeasonalPricingRow {
    id: Uuid,
    room_type_id: Uuid,
    name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    fixed_price: Option<i64>,
    multiplier: Option<f64>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<SeasonalPricingRow> for SeasonalPricing {
    fn from(row: SeasonalPricingRow) -> Self {
        SeasonalPricing {
            id: row.id,
            room_type_id: row.room_type_id,
            name: row.name,
            start_date: row.start_date,
            end_date: row.end_date,
            fixed_price: row.fixed_price,
            multiplier: row.multiplier,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    booking_number: String,
    guest_name: String,
    guest_email: String,
    guest_phone: String,
    guest_region: String,
    nationality: Option<String>,
    special_requests: Option<String>,
    check_in: NaiveDate,
    check_out: NaiveDate,
    adults: i32,
    children: i32,
    occupancy: String,
    total_amount: i64,
    paid_amount: i64,
    currency: String,
    status: String,
    payment_method: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self, rooms: Vec<BookingRoom>) -> Result<Booking, StoreError> {
        Ok(Booking {
            id: self.id,
            booking_number: self.booking_number,
            guest: GuestInfo {
                full_name: self.guest_name,
                email: self.guest_email.into(),
                phone: self.guest_phone.into(),
                region: parse(&self.guest_region)?,
                nationality: self.nationality,
                special_requests: self.special_requests,
            },
            check_in: self.check_in,
            check_out: self.check_out,
            adults: self.adults.max(0) as u32,
            children: self.children.max(0) as u32,
            occupancy: parse(&self.occupancy)?,
            rooms,
            total_amount: self.total_amount,
            paid_amount: self.paid_amount,
            currency: self.currency,
            status: parse(&self.status)?,
            payment_method: self.payment_method.as_deref().map(parse).transpose()?,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingRoomRow {
    id: Uuid,
    booking_id: Uuid,
    room_id: Uuid,
    room_number: String,
    room_type_id: Uuid,
    rate_per_night: i64,
    nights: i64,
    total_price: i64,
}

impl From<BookingRoomRow> for BookingRoom {
    fn from(row: BookingRoomRow) -> Self {
        BookingRoom {
            id: row.id,
            booking_id: row.booking_id,
            room_id: row.room_id,
            room_number: row.room_number,
            room_type_id: row.room_type_id,
            rate_per_night: row.rate_per_night,
            nights: row.nights,
            total_price: row.total_price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount: i64,
    credited_amount: i64,
    method: String,
    status: String,
    reference: Option<String>,
    gateway_receipt: Option<String>,
    payer_phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            booking_id: row.booking_id,
            amount: row.amount,
            credited_amount: row.credited_amount,
            method: parse(&row.method)?,
            status: parse(&row.status)?,
            reference: row.reference,
            gateway_receipt: row.gateway_receipt,
            payer_phone: row.payer_phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
