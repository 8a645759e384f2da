use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_catalog_tables::Migration),
            Box::new(m20260101_000002_create_product_tables::Migration),
            Box::new(m20260101_000003_create_users_table::Migration),
            Box::new(m20260101_000004_create_order_tables::Migration),
            Box::new(m20260101_000005_create_payments_table::Migration),
        ]
    }
}

// Migration implementations

mod m20260101_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Institutions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Institutions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Institutions::Name).string().not_null())
                        .col(ColumnDef::new(Institutions::ContactEmail).string().null())
                        .col(
                            ColumnDef::new(Institutions::IsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Institutions::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Institutions::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AcademicYears::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AcademicYears::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AcademicYears::InstitutionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AcademicYears::Label).string().not_null())
                        .col(ColumnDef::new(AcademicYears::StartsOn).date().not_null())
                        .col(ColumnDef::new(AcademicYears::EndsOn).date().not_null())
                        .col(
                            ColumnDef::new(AcademicYears::IsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(AcademicYears::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AcademicYears::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Courses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Courses::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Courses::InstitutionId).uuid().not_null())
                        .col(ColumnDef::new(Courses::AcademicYearId).uuid().not_null())
                        .col(ColumnDef::new(Courses::Name).string().not_null())
                        .col(ColumnDef::new(Courses::AccessCode).string().not_null())
                        .col(ColumnDef::new(Courses::ValidFrom).timestamp().not_null())
                        .col(ColumnDef::new(Courses::ValidUntil).timestamp().not_null())
                        .col(
                            ColumnDef::new(Courses::IsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Courses::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Courses::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Albums::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Albums::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Albums::CourseId).uuid().not_null())
                        .col(ColumnDef::new(Albums::Name).string().not_null())
                        .col(ColumnDef::new(Albums::ProductTypeId).uuid().null())
                        .col(
                            ColumnDef::new(Albums::IsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Albums::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Albums::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Photos::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Photos::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Photos::AlbumId).uuid().not_null())
                        .col(ColumnDef::new(Photos::Name).string().not_null())
                        .col(ColumnDef::new(Photos::StorageKey).string().not_null())
                        .col(ColumnDef::new(Photos::PreviewUrl).string().not_null())
                        .col(
                            ColumnDef::new(Photos::IsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Photos::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Photos::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_courses_academic_year_id")
                        .table(Courses::Table)
                        .col(Courses::AcademicYearId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_albums_course_id")
                        .table(Albums::Table)
                        .col(Albums::CourseId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_photos_album_id")
                        .table(Photos::Table)
                        .col(Photos::AlbumId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Photos::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Albums::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Courses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(AcademicYears::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Institutions::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Institutions {
        Table,
        Id,
        Name,
        ContactEmail,
        IsEnabled,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum AcademicYears {
        Table,
        Id,
        InstitutionId,
        Label,
        StartsOn,
        EndsOn,
        IsEnabled,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Courses {
        Table,
        Id,
        InstitutionId,
        AcademicYearId,
        Name,
        AccessCode,
        ValidFrom,
        ValidUntil,
        IsEnabled,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Albums {
        Table,
        Id,
        CourseId,
        Name,
        ProductTypeId,
        IsEnabled,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Photos {
        Table,
        Id,
        AlbumId,
        Name,
        StorageKey,
        PreviewUrl,
        IsEnabled,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000002_create_product_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_product_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductTypes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductTypes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductTypes::Name).string().not_null())
                        .col(ColumnDef::new(ProductTypes::Description).string().null())
                        .col(
                            ColumnDef::new(ProductTypes::IsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ProductTypes::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductTypes::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductVariations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductVariations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariations::ProductTypeId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductVariations::Name).string().not_null())
                        .col(
                            ColumnDef::new(ProductVariations::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductVariations::IsDownloadable)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProductVariations::IsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ProductVariations::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariations::UpdatedAt)
                                .timestamp()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Packages::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Packages::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Packages::InstitutionId).uuid().not_null())
                        .col(ColumnDef::new(Packages::Name).string().not_null())
                        .col(
                            ColumnDef::new(Packages::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Packages::IsDownloadable)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Packages::IsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Packages::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Packages::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PackageAlbums::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PackageAlbums::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PackageAlbums::PackageId).uuid().not_null())
                        .col(ColumnDef::new(PackageAlbums::AlbumId).uuid().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_package_albums_package_id")
                        .table(PackageAlbums::Table)
                        .col(PackageAlbums::PackageId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PackageAlbums::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Packages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductVariations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductTypes::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum ProductTypes {
        Table,
        Id,
        Name,
        Description,
        IsEnabled,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum ProductVariations {
        Table,
        Id,
        ProductTypeId,
        Name,
        Price,
        IsDownloadable,
        IsEnabled,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Packages {
        Table,
        Id,
        InstitutionId,
        Name,
        Price,
        IsDownloadable,
        IsEnabled,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum PackageAlbums {
        Table,
        Id,
        PackageId,
        AlbumId,
    }
}

mod m20260101_000003_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(
                            ColumnDef::new(Users::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Phone).string().null())
                        .col(ColumnDef::new(Users::Role).string().not_null())
                        .col(ColumnDef::new(Users::DownloadImages).json().not_null())
                        .col(
                            ColumnDef::new(Users::IsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Users::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Users {
        Table,
        Id,
        Name,
        Email,
        Phone,
        Role,
        DownloadImages,
        IsEnabled,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000004_create_order_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::CustName).string().not_null())
                        .col(ColumnDef::new(Orders::CustEmail).string().not_null())
                        .col(ColumnDef::new(Orders::CustPhone).string().not_null())
                        .col(ColumnDef::new(Orders::ShippingAddress).string().not_null())
                        .col(ColumnDef::new(Orders::ShipmentMethod).string().not_null())
                        .col(ColumnDef::new(Orders::Cart).json().not_null())
                        .col(ColumnDef::new(Orders::Price).decimal().not_null())
                        .col(
                            ColumnDef::new(Orders::ShippingFee)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::PaymentMethod).string().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(ColumnDef::new(Orders::TrackingNo).string().null())
                        .col(ColumnDef::new(Orders::TransactionNo).string().null())
                        .col(ColumnDef::new(Orders::SuccessPaymentId).string().null())
                        .col(ColumnDef::new(Orders::Remark).string().null())
                        .col(
                            ColumnDef::new(Orders::Priority)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderCarts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderCarts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderCarts::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderCarts::UnitKind).string().not_null())
                        .col(ColumnDef::new(OrderCarts::InstitutionId).uuid().not_null())
                        .col(ColumnDef::new(OrderCarts::PhotoId).uuid().null())
                        .col(ColumnDef::new(OrderCarts::PackageId).uuid().null())
                        .col(ColumnDef::new(OrderCarts::Description).string().not_null())
                        .col(ColumnDef::new(OrderCarts::Amount).decimal().not_null())
                        .col(
                            ColumnDef::new(OrderCarts::GrantsDownload)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(OrderCarts::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_carts_order_id")
                        .table(OrderCarts::Table)
                        .col(OrderCarts::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderCarts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Orders {
        Table,
        Id,
        OrderNo,
        UserId,
        CustName,
        CustEmail,
        CustPhone,
        ShippingAddress,
        ShipmentMethod,
        Cart,
        Price,
        ShippingFee,
        PaymentMethod,
        Status,
        TrackingNo,
        TransactionNo,
        SuccessPaymentId,
        Remark,
        Priority,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum OrderCarts {
        Table,
        Id,
        OrderId,
        UnitKind,
        InstitutionId,
        PhotoId,
        PackageId,
        Description,
        Amount,
        GrantsDownload,
        CreatedAt,
    }
}

mod m20260101_000005_create_payments_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000005_create_payments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Payments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Payments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Payments::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(Payments::PaymentId)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Payments::Amount).decimal().not_null())
                        .col(ColumnDef::new(Payments::Currency).string().not_null())
                        .col(ColumnDef::new(Payments::Status).string().not_null())
                        .col(ColumnDef::new(Payments::RequestDetail).json().not_null())
                        .col(ColumnDef::new(Payments::PaymentDetail).json().null())
                        .col(ColumnDef::new(Payments::TransactionNo).string().null())
                        .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Payments::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payments_order_id")
                        .table(Payments::Table)
                        .col(Payments::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Payments::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Payments {
        Table,
        Id,
        OrderId,
        PaymentId,
        Amount,
        Currency,
        Status,
        RequestDetail,
        PaymentDetail,
        TransactionNo,
        CreatedAt,
        UpdatedAt,
    }
}
