use std::sync::Arc;

use tracing::{debug, info, warn};

use super::observer::Observers;
use crate::{
    config::AppConfig,
    error::{ConfigurationError, EngineError, Result},
    models::Status,
    navigation::{go_home, go_previous, turn_page, NavAction, NavigationRouter},
    pagination::{paginate, PageCache},
    request::UssdRequest,
    response::UssdResponse,
    screen::{
        namespace::namespace_of, ArityError, ScreenContext, ScreenHandle, ScreenRegistry,
        ScreenResult, ScreenTarget,
    },
    session::{ScreenState, Session, SessionPhase, SessionStore},
};

/// Runs one turn: lock, load, route, render, paginate, save.
pub(crate) struct Dispatcher {
    registry: Arc<ScreenRegistry>,
    store: Arc<SessionStore>,
    router: NavigationRouter,
    config: Arc<AppConfig>,
    observers: Observers,
}

/// How the active screen is entered on a pass.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// First pass, with the subscriber's input.
    Input,
    /// Re-entered after a redirect or history move, without input.
    Internal,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Arc<ScreenRegistry>,
        store: Arc<SessionStore>,
        config: Arc<AppConfig>,
        observers: Observers,
    ) -> Self {
        Self {
            router: NavigationRouter::new(&config.navigation),
            registry,
            store,
            config,
            observers,
        }
    }

    pub(crate) async fn dispatch(&self, request: &mut UssdRequest) -> Result<UssdResponse> {
        let key = request.key().clone();
        let _lease = self.store.lock(&key.msisdn).await?;
        let mut session = self.store.open(key).await?;
        self.observers.session_opened(&session);

        match self.run_turn(&mut session, request) {
            Ok((status, body)) => {
                session.finish_turn(status);
                self.store.close(&session).await?;
                self.observers.session_saved(&session);
                info!(
                    session = %session.key,
                    screen = session.state.as_ref().map(|s| s.screen.as_str()).unwrap_or("-"),
                    status = %status,
                    "Turn completed"
                );
                Ok(UssdResponse::new(status, body))
            }
            Err(err) => {
                if let Err(touch_err) = self.store.touch(&session.key).await {
                    warn!(session = %session.key, error = %touch_err, "Failed to extend session after error");
                }
                request.session = Some(session);
                Err(err)
            }
        }
    }

    fn run_turn(&self, session: &mut Session, request: &UssdRequest) -> Result<(Status, String)> {
        let initial = self.config.initial_screen.as_str();
        if session.phase() == SessionPhase::Terminal {
            debug!(session = %session.key, "Previous turn ended the session, starting over");
            session.reset();
        }
        let restoring = session.stale;
        if session.state.is_none() {
            session.state = Some(ScreenState::new(initial));
            session.pages = None;
        }

        let mut args: Vec<String> = request.input().args().to_vec();
        let mut pass = Pass::Input;
        let mut hops = 0usize;
        let mut trail: Vec<String> = Vec::new();

        loop {
            let screen = self.active_screen(session)?;
            if trail.is_empty() {
                trail.push(screen.name().to_string());
            }

            let result = if pass == Pass::Input {
                if args.len() > screen.arity() {
                    let error = ArityError {
                        screen: screen.name().to_string(),
                        arity: screen.arity(),
                        args: args.clone(),
                    };
                    debug!(screen = %error.screen, received = args.len(), "Arity exceeded");
                    self.on_arity_error(session, request, &screen, &error, restoring)?
                } else {
                    match self.router.route(args.first().map(String::as_str), session, &screen) {
                        Some(action @ (NavAction::More | NavAction::Back)) => {
                            if let Some(page) = turn_page(session, action) {
                                return Ok(page);
                            }
                            self.render(session, request, &screen, &args, restoring)?
                        }
                        Some(NavAction::Previous) => {
                            go_previous(session, initial);
                            args.clear();
                            pass = Pass::Internal;
                            continue;
                        }
                        Some(NavAction::Home) => {
                            go_home(session, initial);
                            args.clear();
                            pass = Pass::Internal;
                            continue;
                        }
                        None => self.render(session, request, &screen, &args, restoring)?,
                    }
                }
            } else {
                self.render(session, request, &screen, &args, false)?
            };
            pass = Pass::Internal;

            match result {
                ScreenResult::Redirect(redirect) => {
                    let target = self
                        .registry
                        .resolve(&redirect.target, namespace_of(screen.name()))?;
                    hops += 1;
                    trail.push(target.name().to_string());
                    if hops > self.config.max_redirects {
                        return Err(EngineError::RedirectLoopExceeded {
                            limit: self.config.max_redirects,
                            trail,
                        });
                    }
                    if let Some(undeclared) = redirect.params.keys().find(|key| !target.declares(key)) {
                        return Err(EngineError::navigation(format!(
                            "screen '{}' does not declare state attribute '{undeclared}'",
                            target.name()
                        )));
                    }
                    debug!(from = %screen.name(), to = %target.name(), hops, "Redirecting");

                    if let Some(previous) = session.state.take() {
                        session.history.push(previous);
                    }
                    session.state = Some(ScreenState {
                        screen: target.name().to_string(),
                        attributes: redirect.params,
                        redirect_args: redirect.args,
                    });
                    session.pages = None;
                    args.clear();
                }
                ScreenResult::Continue(body) => {
                    return self.emit(session, &screen, Status::Continue, &body, restoring)
                }
                ScreenResult::End(body) => {
                    return self.emit(session, &screen, Status::End, &body, restoring)
                }
            }
        }
    }

    fn active_screen(&self, session: &mut Session) -> Result<ScreenHandle> {
        let name = match &session.state {
            Some(state) => state.screen.clone(),
            None => {
                session.state = Some(ScreenState::new(self.config.initial_screen.as_str()));
                self.config.initial_screen.clone()
            }
        };
        self.registry.resolve(&ScreenTarget::Name(name), None)
    }

    fn render(
        &self,
        session: &mut Session,
        request: &UssdRequest,
        screen: &ScreenHandle,
        args: &[String],
        restoring: bool,
    ) -> Result<ScreenResult> {
        let handler = Arc::clone(screen.handler().ok_or_else(|| missing_handler(screen))?);
        let mut ctx = ScreenContext::new(
            session,
            screen,
            request.data(),
            &self.config.initial_screen,
            restoring,
        );
        let outcome = if restoring {
            debug!(screen = %screen.name(), "Restoring stale session");
            handler.restore(&mut ctx, args)
        } else {
            handler.render(&mut ctx, args)
        };
        outcome.map_err(|source| EngineError::Screen {
            screen: screen.name().to_string(),
            source,
        })
    }

    fn on_arity_error(
        &self,
        session: &mut Session,
        request: &UssdRequest,
        screen: &ScreenHandle,
        error: &ArityError,
        restoring: bool,
    ) -> Result<ScreenResult> {
        let handler = Arc::clone(screen.handler().ok_or_else(|| missing_handler(screen))?);
        let mut ctx = ScreenContext::new(
            session,
            screen,
            request.data(),
            &self.config.initial_screen,
            restoring,
        );
        let outcome = handler
            .arity_error(&mut ctx, error)
            .map_err(|source| EngineError::Screen {
                screen: screen.name().to_string(),
                source,
            })?;
        Ok(outcome.unwrap_or_else(|| ctx.con()))
    }

    fn emit(
        &self,
        session: &mut Session,
        screen: &ScreenHandle,
        status: Status,
        body: &str,
        restoring: bool,
    ) -> Result<(Status, String)> {
        let footer = match status {
            Status::Continue => self.router.footer(screen),
            Status::End => Vec::new(),
        };
        let pages = paginate(
            body,
            self.config.page_budget(),
            self.router.more(),
            self.router.back(),
            &footer,
        )?;
        debug!(screen = %screen.name(), pages = pages.len(), status = %status, "Rendered response");

        let cache = PageCache::new(status, pages);
        let shown = (cache.current_status(), cache.current_page().to_string());
        session.pages = Some(cache);
        if restoring {
            session.mark_restored();
        }
        Ok(shown)
    }
}

fn missing_handler(screen: &ScreenHandle) -> EngineError {
    ConfigurationError::InvalidDescriptor {
        name: screen.name().to_string(),
        reason: "no handler".to_string(),
    }
    .into()
}
