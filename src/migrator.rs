use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240601_000001_create_produce_orders_table::Migration)]
    }
}

mod m20240601_000001_create_produce_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_produce_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProduceOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProduceOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProduceOrders::Item).string().not_null())
                        .col(ColumnDef::new(ProduceOrders::Name).string().null())
                        .col(ColumnDef::new(ProduceOrders::Category).string().null())
                        .col(ColumnDef::new(ProduceOrders::ProductImage).string().null())
                        .col(
                            ColumnDef::new(ProduceOrders::Quantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProduceOrders::UnitPrice)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProduceOrders::TotalPrice)
                                .decimal_len(20, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProduceOrders::SellerId).string().not_null())
                        .col(ColumnDef::new(ProduceOrders::FarmerId).string().not_null())
                        .col(ColumnDef::new(ProduceOrders::DeliverymanId).string().null())
                        .col(ColumnDef::new(ProduceOrders::District).string().null())
                        .col(ColumnDef::new(ProduceOrders::Company).string().null())
                        .col(ColumnDef::new(ProduceOrders::Mobile).string().null())
                        .col(ColumnDef::new(ProduceOrders::Email).string().null())
                        .col(ColumnDef::new(ProduceOrders::Address).string().null())
                        .col(ColumnDef::new(ProduceOrders::ExpireDate).date().null())
                        .col(
                            ColumnDef::new(ProduceOrders::Status)
                                .string_len(16)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(ProduceOrders::AcceptedByDeliveryman)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProduceOrders::DeliveryStatus)
                                .string_len(16)
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(ProduceOrders::SellerNote).text().null())
                        .col(ColumnDef::new(ProduceOrders::FarmerNote).text().null())
                        .col(ColumnDef::new(ProduceOrders::DeliverymanNote).text().null())
                        .col(
                            ColumnDef::new(ProduceOrders::FarmerApprovalDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProduceOrders::DeliveryAcceptedDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProduceOrders::DeliveryCompletedDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProduceOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProduceOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, column) in [
                ("idx_produce_orders_seller_id", ProduceOrders::SellerId),
                ("idx_produce_orders_farmer_id", ProduceOrders::FarmerId),
                ("idx_produce_orders_deliveryman_id", ProduceOrders::DeliverymanId),
                ("idx_produce_orders_created_at", ProduceOrders::CreatedAt),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(ProduceOrders::Table)
                            .col(column)
                            .to_owned(),
                    )
                    .await?;
            }

            // Serves the available-for-delivery view.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_produce_orders_status_accepted")
                        .table(ProduceOrders::Table)
                        .col(ProduceOrders::Status)
                        .col(ProduceOrders::AcceptedByDeliveryman)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProduceOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ProduceOrders {
        Table,
        Id,
        Item,
        Name,
        Category,
        ProductImage,
        Quantity,
        UnitPrice,
        TotalPrice,
        SellerId,
        FarmerId,
        DeliverymanId,
        District,
        Company,
        Mobile,
        Email,
        Address,
        ExpireDate,
        Status,
        AcceptedByDeliveryman,
        DeliveryStatus,
        SellerNote,
        FarmerNote,
        DeliverymanNote,
        FarmerApprovalDate,
        DeliveryAcceptedDate,
        DeliveryCompletedDate,
        CreatedAt,
        UpdatedAt,
    }
}
