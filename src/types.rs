/// Key of a column in the merged column model.
/// Examples: `city`, `fullName`, `A_rate_2`
pub type ColumnKey = String;
/// Identifier of a field inside a dynamic group.
/// Examples: `A_rate_2`, `O_score_4`, `Q_discount_1`
pub type FieldId = String;
/// Name of a configured dynamic group.
/// Examples: `account`, `opportunity`, `quote`
pub type GroupName = String;
/// Identifier for the record source that answered a request.
/// Examples: `in_memory`, `mock_backend`
pub type SourceId = String;
/// Opaque token identifying one export job.
/// Example: `tok_k3v9x0a`
pub type DownloadToken = String;
/// Encoded filter or sort query string.
/// Examples: `&city=contains:King&age=gt:40`, `&sortBy=age&sortOrder=desc`
pub type QueryText = String;
