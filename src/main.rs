use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use todoapp_model::{
    CreateTodoInput, FiltersPatch, SortBy, SortOrder, StatusFilter, Todo, TodoId, TodoStatus,
    UpdateTodoInput,
};
use todoapp_store::{ClientConfig, HttpGateway, TodoStore};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "todoapp", about = "Work with the task list of a remote todo API")]
struct Cli {
    /// Base URL of the task API (overrides TODOAPP_API_BASE)
    #[arg(long)]
    api_base: Option<String>,

    /// Bearer token sent with every request (overrides TODOAPP_TOKEN)
    #[arg(long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List todos
    List {
        #[arg(long, value_enum, default_value_t = StatusArg::All)]
        status: StatusArg,
        /// Case-insensitive match against the title
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = SortArg::Created)]
        sort: SortArg,
        #[arg(long, value_enum, default_value_t = OrderArg::Desc)]
        order: OrderArg,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Create a todo
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Start the todo as in progress instead of pending
        #[arg(long)]
        in_progress: bool,
    },
    /// Change fields of a todo
    Edit {
        id: TodoId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_enum)]
        status: Option<StateArg>,
    },
    /// Flip a todo between pending and completed
    Toggle { id: TodoId },
    /// Mark a todo as completed
    Complete { id: TodoId },
    /// Delete a todo
    Delete { id: TodoId },
    /// Completion counts for the first page
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    All,
    Pending,
    Completed,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::All => StatusFilter::All,
            StatusArg::Pending => StatusFilter::Pending,
            StatusArg::Completed => StatusFilter::Completed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Created,
    Title,
}

impl From<SortArg> for SortBy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Created => SortBy::CreatedAt,
            SortArg::Title => SortBy::Title,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Asc => SortOrder::Asc,
            OrderArg::Desc => SortOrder::Desc,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
    Pending,
    InProgress,
    Completed,
}

impl From<StateArg> for TodoStatus {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Pending => TodoStatus::Pending,
            StateArg::InProgress => TodoStatus::InProgress,
            StateArg::Completed => TodoStatus::Completed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env().context("Failed to load client configuration")?;
    if let Some(api_base) = cli.api_base {
        config.api_base = api_base;
    }
    if let Some(token) = cli.token {
        config.token = Some(token);
    }

    info!(api_base = %config.api_base, "Starting todoapp client");
    let store = TodoStore::with_page_size(HttpGateway::from_config(&config), config.page_size);
    run(&store, cli.command).await
}

async fn run(store: &TodoStore<HttpGateway>, command: Command) -> Result<()> {
    match command {
        Command::List {
            status,
            search,
            sort,
            order,
            page,
        } => {
            store.set_filters(FiltersPatch {
                status: Some(status.into()),
                search: search.map(Some),
                sort_by: Some(sort.into()),
                sort_order: Some(order.into()),
            });
            store.set_page(page);
            store.fetch(None, None).await;
            check(store)?;

            let view = store.filtered_view();
            if view.is_empty() {
                println!("No tasks yet!");
            }
            for todo in &view {
                print_todo(todo);
            }
            let pagination = store.snapshot().pagination;
            println!(
                "page {} of {} ({} total)",
                pagination.page,
                pagination.total_pages.max(1),
                pagination.total
            );
        }
        Command::Add {
            title,
            description,
            in_progress,
        } => {
            let mut input = CreateTodoInput::new(title);
            if let Some(description) = description {
                input = input.with_description(description);
            }
            if in_progress {
                input = input.with_status(TodoStatus::InProgress);
            }
            let created = store.create(input).await?;
            check(store)?;
            if let Some(todo) = created {
                print_todo(&todo);
            }
        }
        Command::Edit {
            id,
            title,
            description,
            status,
        } => {
            let input = UpdateTodoInput {
                title,
                description,
                status: status.map(Into::into),
                is_completed: None,
            };
            let updated = store.update(id, input).await?;
            check(store)?;
            if let Some(todo) = updated {
                print_todo(&todo);
            }
        }
        Command::Toggle { id } => {
            // Toggling flips the loaded copy first, so the todo has to be loaded
            store.fetch(None, None).await;
            check(store)?;
            if store.find_by_id(id).is_none() {
                bail!("Todo {id} is not on the first page of results");
            }
            let toggled = store.toggle_status(id).await;
            check(store)?;
            if let Some(todo) = toggled {
                print_todo(&todo);
            }
        }
        Command::Complete { id } => {
            let completed = store.mark_completed(id).await;
            check(store)?;
            if let Some(todo) = completed {
                print_todo(&todo);
            }
        }
        Command::Delete { id } => {
            let deleted = store.delete(id).await;
            check(store)?;
            if let Some(id) = deleted {
                println!("Deleted todo {id}");
            }
        }
        Command::Stats => {
            store.fetch(None, None).await;
            check(store)?;
            let stats = store.stats();
            println!(
                "{} total, {} completed ({}%), {} pending of which {} in progress",
                stats.total,
                stats.completed,
                stats.completion_rate,
                stats.pending,
                stats.in_progress
            );
            println!("{} completed today", stats.completed_today);
        }
    }
    Ok(())
}

/// Turns an error left in the store into the command's failure.
fn check(store: &TodoStore<HttpGateway>) -> Result<()> {
    match store.snapshot().error {
        Some(error) => bail!("{error}"),
        None => Ok(()),
    }
}

fn print_todo(todo: &Todo) {
    let mark = if todo.is_completed { "x" } else { " " };
    let created_at = todo.created_at.format("%b %d, %Y at %H:%M");
    println!("[{mark}] #{} {} ({}, created {created_at})", todo.id, todo.title, todo.status);
    if !todo.description.is_empty() {
        println!("      {}", todo.description);
    }
}
