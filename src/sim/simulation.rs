//! 仿真内核
//!
//! 维护节点注册表、事件队列、逻辑时钟与检查点栈，并实现
//! 因果有序的运行循环。

use std::collections::{BinaryHeap, HashMap};
use std::mem;
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use super::connection::{Connection, ConnectionParams};
use super::error::SimError;
use super::event::{Event, EventKind, EventSequence, Payload, PeriodicSequence};
use super::id::ConnId;
use super::node::EventProcessor;
use super::port::{Port, PortSpec};
use super::realtime::RealTimePacer;
use super::scheduled_event::ScheduledEvent;
use super::time::{Clock, SimTime};

/// 运行钩子：在整个 `run` 调用前后各执行一次。
pub type RunHook = Box<dyn FnMut() + Send>;

/// 命令：预注册的可调度回调。
pub type CommandFn = Arc<dyn Fn(&mut Simulation) -> Result<(), SimError> + Send + Sync>;

struct NodeEntry {
    // 派发期间节点被暂时取出，槽位置空。
    ep: Option<Box<dyn EventProcessor>>,
    src_ports: PortSpec,
    dest_ports: PortSpec,
    in_conns: Vec<ConnId>,
    out_conns: Vec<ConnId>,
}

/// 检查点帧：时钟值、序列号计数与事件队列的快照。
struct StateFrame {
    now: SimTime,
    next_seq: u64,
    queue: BinaryHeap<ScheduledEvent>,
}

/// 事件驱动仿真内核。
///
/// 持有节点注册表、连接表、当前时间与事件队列，按时间序（同时
/// 事件按 FIFO）交付事件，并提供可嵌套的检查点协议以支持
/// 非破坏性的探测。
#[derive(Default)]
pub struct Simulation {
    clock: Clock,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    nodes: HashMap<String, NodeEntry>,
    conns: Vec<Option<Connection>>,
    eps_to_start: Vec<String>,
    state_stack: Vec<StateFrame>,
    commands: HashMap<String, CommandFn>,
    pacer: Option<RealTimePacer>,
    run_start_hooks: Vec<RunHook>,
    run_stop_hooks: Vec<RunHook>,
}

impl Simulation {
    pub fn new() -> Simulation {
        Simulation::default()
    }

    /// 创建实时仿真：时钟前进时按 `timescale`（每 tick 的真实
    /// 毫秒数）同步挂起墙钟时间。
    pub fn realtime(timescale: f64) -> Simulation {
        Simulation {
            pacer: Some(RealTimePacer::new(timescale)),
            ..Simulation::default()
        }
    }

    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// 设置时钟软停止上限；见 `Clock`。
    pub fn set_until(&mut self, until: Option<SimTime>) {
        self.clock.set_until(until);
    }

    pub fn queue_len(&self) -> usize {
        self.q.len()
    }

    /// 队首事件（时间最早、同时间中最先入队者）。
    pub fn peek_next(&self) -> Option<&ScheduledEvent> {
        self.q.peek()
    }

    /// 队列中指定种类事件的数量。
    pub fn pending_count(&self, kind: EventKind) -> usize {
        self.q.iter().filter(|se| se.ev.kind() == kind).count()
    }

    /// 检查点栈深度，等于未配对的 `state_push` 次数。
    pub fn state_depth(&self) -> usize {
        self.state_stack.len()
    }

    /// 调度事件在指定时间执行
    #[tracing::instrument(skip(self, ev), fields(kind = ?ev.kind(), at = ?at))]
    pub fn enqueue(&mut self, at: SimTime, ev: Event) {
        let seq = self.next_seq;
        trace!(now = ?self.clock.now(), seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent { at, seq, ev });

        debug!(queue_size = self.q.len(), "事件已加入队列");
    }

    /// 在指定时间执行一条预注册命令。
    ///
    /// 调度时即检查命令已注册，未注册的命令名立即报错。
    pub fn schedule_command(
        &mut self,
        at: SimTime,
        name: impl Into<String>,
    ) -> Result<(), SimError> {
        let name = name.into();
        if !self.commands.contains_key(&name) {
            return Err(SimError::UnknownCommand(name));
        }
        self.enqueue(at, Event::Command { name });
        Ok(())
    }

    /// 注册一条命令回调，之后可用 `schedule_command` 调度。
    pub fn register_command(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&mut Simulation) -> Result<(), SimError> + Send + Sync + 'static,
    ) {
        self.commands.insert(name.into(), Arc::new(f));
    }

    /// 清除队列中指定种类的全部待处理事件。
    ///
    /// 这是系统里唯一的取消原语；通常包在 state_push / state_pop
    /// 之间使用，使清除可以回滚。
    pub fn clear_pending(&mut self, kind: EventKind) {
        let before = self.q.len();
        let q = mem::take(&mut self.q);
        self.q = q.into_iter().filter(|se| se.ev.kind() != kind).collect();
        debug!(?kind, removed = before - self.q.len(), "清除待处理事件");
    }

    /// 注册节点并设置其名称。
    ///
    /// 与字典一致：同名节点被静默替换（其连接一并拆除）。新节点
    /// 排队等待下一次 `run` 开始时的一次性 `start` 调用。
    pub fn register(&mut self, name: impl Into<String>, mut ep: Box<dyn EventProcessor>) {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            debug!(node = %name, "同名节点已存在，将被替换");
            self.remove_entry(&name);
        }
        ep.set_name(&name);
        let entry = NodeEntry {
            src_ports: ep.src_ports(),
            dest_ports: ep.dest_ports(),
            ep: Some(ep),
            in_conns: Vec::new(),
            out_conns: Vec::new(),
        };
        self.nodes.insert(name.clone(), entry);
        self.eps_to_start.push(name);
    }

    /// 移除节点及其全部进出连接。
    pub fn unregister(&mut self, name: &str) -> Result<(), SimError> {
        if !self.nodes.contains_key(name) {
            return Err(SimError::UnknownNode(name.to_string()));
        }
        info!(node = %name, "注销节点");
        self.remove_entry(name);
        Ok(())
    }

    fn remove_entry(&mut self, name: &str) {
        if let Some(entry) = self.nodes.remove(name) {
            for id in entry.in_conns.into_iter().chain(entry.out_conns) {
                self.unlink(id);
            }
            self.eps_to_start.retain(|n| n != name);
        }
    }

    fn unlink(&mut self, id: ConnId) {
        let Some(conn) = self.conns.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        if let Some(src) = self.nodes.get_mut(&conn.src) {
            src.out_conns.retain(|c| *c != id);
        }
        if let Some(dest) = self.nodes.get_mut(&conn.dest) {
            dest.in_conns.retain(|c| *c != id);
        }
    }

    /// 按名称获取节点。
    pub fn get(&self, name: &str) -> Option<&dyn EventProcessor> {
        self.nodes.get(name).and_then(|e| e.ep.as_deref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut dyn EventProcessor> {
        self.nodes.get_mut(name).and_then(|e| e.ep.as_deref_mut())
    }

    /// 按名称获取指定具体类型的节点。
    pub fn get_as<T: EventProcessor>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(|ep| ep.as_any().downcast_ref::<T>())
    }

    pub fn get_as_mut<T: EventProcessor>(&mut self, name: &str) -> Option<&mut T> {
        self.get_mut(name)
            .and_then(|ep| ep.as_any_mut().downcast_mut::<T>())
    }

    /// 遍历全部已注册节点。
    pub fn objects(&self) -> impl Iterator<Item = (&str, &dyn EventProcessor)> {
        self.nodes
            .iter()
            .filter_map(|(n, e)| e.ep.as_deref().map(|ep| (n.as_str(), ep)))
    }

    /// 遍历指定具体类型的节点。
    pub fn objects_of<T: EventProcessor>(&self) -> impl Iterator<Item = (&str, &T)> {
        self.objects()
            .filter_map(|(n, ep)| ep.as_any().downcast_ref::<T>().map(|t| (n, t)))
    }

    /// 暂时取出节点执行回调，期间节点可重入地访问内核。
    pub fn with_node<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut dyn EventProcessor, &mut Simulation) -> R,
    ) -> Option<R> {
        let mut ep = self.take_ep(name)?;
        let r = f(ep.as_mut(), self);
        self.put_ep(name, ep);
        Some(r)
    }

    fn take_ep(&mut self, name: &str) -> Option<Box<dyn EventProcessor>> {
        self.nodes.get_mut(name).and_then(|e| e.ep.take())
    }

    fn put_ep(&mut self, name: &str, ep: Box<dyn EventProcessor>) {
        // 节点在自身钩子里把自己注销了：直接丢弃。
        if let Some(e) = self.nodes.get_mut(name) {
            e.ep = Some(ep);
        }
    }

    /// 连接两个已注册节点。
    ///
    /// 创建时对两端的端口声明与连接名唯一性做检查；连接名缺省为
    /// `"{src}To{dest}"`。
    #[tracing::instrument(skip(self, params), fields(src = %src, dest = %dest))]
    pub fn connect(
        &mut self,
        src: &str,
        dest: &str,
        params: ConnectionParams,
    ) -> Result<ConnId, SimError> {
        let name = params
            .name
            .unwrap_or_else(|| format!("{src}To{dest}"));

        let src_entry = self
            .nodes
            .get(src)
            .ok_or_else(|| SimError::UnknownNode(src.to_string()))?;
        let dest_entry = self
            .nodes
            .get(dest)
            .ok_or_else(|| SimError::UnknownNode(dest.to_string()))?;

        if !src_entry.src_ports.allows(&params.src_port) {
            return Err(SimError::IllegalSrcPort {
                node: src.to_string(),
                port: params.src_port,
            });
        }
        if !dest_entry.dest_ports.allows(&params.dest_port) {
            return Err(SimError::IllegalDestPort {
                node: dest.to_string(),
                port: params.dest_port,
            });
        }

        // 名称唯一性：源端到同一目的地唯一；目的端入连接之间全局唯一。
        for id in &src_entry.out_conns {
            if let Some(c) = self.connection_raw(*id) {
                if c.name == name && c.dest == dest {
                    return Err(SimError::DuplicateOutConnection {
                        src: src.to_string(),
                        dest: dest.to_string(),
                        name,
                    });
                }
            }
        }
        for id in &dest_entry.in_conns {
            if let Some(c) = self.connection_raw(*id) {
                if c.name == name {
                    return Err(SimError::DuplicateInConnection {
                        dest: dest.to_string(),
                        name,
                    });
                }
            }
        }

        let id = ConnId(self.conns.len());
        let conn = Connection {
            src: src.to_string(),
            dest: dest.to_string(),
            name,
            src_port: params.src_port,
            dest_port: params.dest_port,
            delay: params.delay,
            private: params.private,
        };
        debug!(conn = %conn.name, delay = ?conn.delay, "创建连接");
        self.conns.push(Some(conn));
        if let Some(e) = self.nodes.get_mut(src) {
            e.out_conns.push(id);
        }
        if let Some(e) = self.nodes.get_mut(dest) {
            e.in_conns.push(id);
        }
        Ok(id)
    }

    /// 拆除一条连接，从两端的连接列表中解除链接。
    pub fn disconnect(&mut self, id: ConnId) -> Result<(), SimError> {
        if self.connection_raw(id).is_none() {
            return Err(SimError::UnknownConnection(id));
        }
        self.unlink(id);
        Ok(())
    }

    /// 按 id 获取连接（含内部连接）。
    pub fn connection(&self, id: ConnId) -> Option<&Connection> {
        self.connection_raw(id)
    }

    fn connection_raw(&self, id: ConnId) -> Option<&Connection> {
        self.conns.get(id.0).and_then(|slot| slot.as_ref())
    }

    /// 全部用户可见连接（跳过内部连接）。
    pub fn connections(&self) -> Vec<&Connection> {
        self.conns
            .iter()
            .flatten()
            .filter(|c| !c.private)
            .collect()
    }

    /// 修改连接延迟。
    pub fn set_delay(&mut self, id: ConnId, delay: SimTime) -> Result<(), SimError> {
        let slot = self
            .conns
            .get_mut(id.0)
            .and_then(|s| s.as_mut())
            .ok_or(SimError::UnknownConnection(id))?;
        slot.delay = delay;
        Ok(())
    }

    /// 将负载发送到指定节点在给定输出端口上的所有出连接。
    ///
    /// 每条出连接各入队一份负载的拷贝，交付时间为 `now + delay`；
    /// 发送方之后修改原数据不会影响已生成的事件。
    #[tracing::instrument(skip(self, data), fields(src = %src, port = %port))]
    pub fn send_output(&mut self, src: &str, port: &Port, data: Payload) {
        let Some(entry) = self.nodes.get(src) else {
            warn!(src = %src, "发送方未注册，丢弃输出");
            return;
        };
        let matching: Vec<ConnId> = entry
            .out_conns
            .iter()
            .copied()
            .filter(|id| {
                self.connection_raw(*id)
                    .is_some_and(|c| c.src_port == *port)
            })
            .collect();

        let now = self.clock.now();
        for id in matching {
            let Some(delay) = self.connection_raw(id).map(|c| c.delay) else {
                continue;
            };
            trace!(conn = ?id, ?delay, "生成交付事件");
            self.enqueue(
                now.saturating_add(delay),
                Event::Delivery {
                    conn: id,
                    data: data.clone(),
                },
            );
        }
    }

    /// 运行指定时长。
    pub fn run(&mut self, duration: SimTime) {
        self.run_for(Some(duration), None);
    }

    /// 运行到指定时刻为止。
    pub fn run_until(&mut self, until: SimTime) {
        self.run_for(None, Some(until));
    }

    /// 运行直到事件队列耗尽。
    pub fn run_forever(&mut self) {
        self.run_for(None, None);
    }

    /// 运行仿真：`duration` 与 `until` 先到者生效，`None` 表示不限。
    ///
    /// 先启动所有待启动节点；随后按时间序交付事件，每个推进的
    /// tick 在交付完当前时刻全部事件后、时钟前进前触发一次各节点
    /// 的 tick 钩子；时间早于当前时钟的事件告警丢弃，从不补发。
    #[tracing::instrument(skip(self), fields(now = ?self.clock.now(), queue_size = self.q.len()))]
    pub fn run_for(&mut self, duration: Option<SimTime>, until: Option<SimTime>) {
        info!("▶️  开始运行仿真");

        for h in &mut self.run_start_hooks {
            h();
        }
        if let Some(p) = &mut self.pacer {
            p.stamp();
        }

        self.start_pending();

        let now = self.clock.now();
        let mut stop = match (duration, until) {
            (Some(d), Some(u)) => Some(now.saturating_add(d).min(u)),
            (Some(d), None) => Some(now.saturating_add(d)),
            (None, Some(u)) => Some(u),
            (None, None) => None,
        };
        stop = self.clock.clamp_stop(stop);
        debug!(?stop, "运行窗口确定");

        let mut did_event = false;
        let mut delivered: u64 = 0;

        while let Some(head_at) = self.q.peek().map(|se| se.at) {
            if stop.is_some_and(|s| self.clock.now() > s) {
                break;
            }

            if head_at < self.clock.now() {
                // 过期事件永不迟交。
                let stale = self.q.pop().expect("peek then pop");
                warn!(at = ?stale.at, kind = ?stale.ev.kind(), "丢弃过期未处理事件");
            } else if head_at > self.clock.now() {
                // 当前时刻的事件已全部交付：先触发 tick 钩子，
                // 再把时钟推进到队首事件。
                if did_event {
                    did_event = false;
                    self.process_current_time_all();
                }
                // tick 钩子可能改变了队首。
                match self.q.peek().map(|se| se.at) {
                    Some(next) if next > self.clock.now() => self.advance_to(next),
                    _ => {}
                }
            } else {
                let item = self.q.pop().expect("peek then pop");
                trace!(seq = item.seq, at = ?item.at, "交付事件");
                self.dispatch(item.ev);
                did_event = true;
                delivered += 1;
            }
        }

        if let Some(stop) = stop {
            // 队列耗尽或越过停止时刻时，把时钟对齐到停止时刻。
            self.clock.set_now(stop);
        }

        for h in &mut self.run_stop_hooks {
            h();
        }

        info!(
            total_events = delivered,
            final_time = ?self.clock.now(),
            "✅ 仿真运行结束"
        );
    }

    /// 注册在每次 `run` 进入时调用的钩子。
    pub fn add_run_start_hook(&mut self, h: impl FnMut() + Send + 'static) {
        self.run_start_hooks.push(Box::new(h));
    }

    /// 注册在每次 `run` 退出时调用的钩子。
    pub fn add_run_stop_hook(&mut self, h: impl FnMut() + Send + 'static) {
        self.run_stop_hooks.push(Box::new(h));
    }

    fn start_pending(&mut self) {
        let pending = mem::take(&mut self.eps_to_start);
        for name in pending {
            if let Some(mut ep) = self.take_ep(&name) {
                debug!(node = %name, "启动节点");
                ep.start(self);
                self.put_ep(&name, ep);
            }
        }
    }

    fn process_current_time_all(&mut self) {
        trace!(now = ?self.clock.now(), "触发各节点的 tick 钩子");
        // 以名称排序，保证钩子触发顺序可复现。
        let mut names: Vec<String> = self.nodes.keys().cloned().collect();
        names.sort();
        for name in names {
            if let Some(mut ep) = self.take_ep(&name) {
                ep.process_current_time(self);
                self.put_ep(&name, ep);
            }
        }
    }

    fn advance_to(&mut self, next: SimTime) {
        let gap = next.saturating_sub(self.clock.now());
        if let Some(p) = &mut self.pacer {
            p.pace(gap);
        }
        trace!(from = ?self.clock.now(), to = ?next, "时钟前进");
        self.clock.set_now(next);
    }

    fn dispatch(&mut self, ev: Event) {
        match ev {
            Event::Delivery { conn, data } => self.dispatch_delivery(conn, data),
            Event::Command { name } => self.dispatch_command(&name),
            Event::Function(call) => {
                debug!(label = %call.label(), "执行函数事件");
                call.invoke(self);
            }
            Event::Sequence(seq) => self.dispatch_sequence(seq),
            Event::Periodic(p) => self.dispatch_periodic(p),
        }
    }

    fn dispatch_delivery(&mut self, id: ConnId, data: Payload) {
        let Some(conn) = self.connection_raw(id).cloned() else {
            warn!(conn = ?id, "连接已拆除，丢弃在途交付事件");
            return;
        };
        let Some(mut ep) = self.take_ep(&conn.dest) else {
            warn!(dest = %conn.dest, "目的节点已注销，丢弃在途交付事件");
            return;
        };
        debug!(conn = %conn.name, dest = %conn.dest, "📨 交付负载");
        ep.input_event(&conn, data, self);
        self.put_ep(&conn.dest, ep);
    }

    fn dispatch_command(&mut self, name: &str) {
        let Some(f) = self.commands.get(name).cloned() else {
            // 注册表在调度之后可能被改动；缺失的命令不终止运行。
            error!(command = %name, "命令未注册，跳过");
            return;
        };
        info!(command = %name, "执行预定命令");
        if let Err(err) = f(self) {
            // 单条命令失败不中止本次 run 余下的事件交付。
            error!(command = %name, error = %err, "预定命令执行失败");
        }
    }

    fn dispatch_sequence(&mut self, seq: EventSequence) {
        // 子事件时间为相对偏移，从当前时刻起逐项累加。
        let mut at = self.clock.now();
        for sub in seq.events {
            at = at.saturating_add(sub.offset);
            self.enqueue(at, sub.ev);
        }
    }

    fn dispatch_periodic(&mut self, p: PeriodicSequence) {
        self.dispatch_sequence(p.sequence.clone());

        let span = p.sequence.span();
        let next = if span < p.period { p.period } else { span };
        let at = self.clock.now().saturating_add(next);
        debug!(period = ?p.period, ?span, next = ?at, "周期序列重新入队");
        self.enqueue(at, Event::Periodic(p));
    }

    /// 保存当前仿真状态，供之后回滚。
    ///
    /// 快照包含时钟与整个事件队列，同时让每个节点递归保存自身
    /// 状态。若仍有节点未执行一次性启动，先做一次零时长 run，
    /// 避免启动副作用被误回滚。
    #[tracing::instrument(skip(self))]
    pub fn state_push(&mut self) {
        if !self.eps_to_start.is_empty() {
            self.run(SimTime::ZERO);
        }
        info!(depth = self.state_stack.len() + 1, "💾 压入检查点");
        self.state_stack.push(StateFrame {
            now: self.clock.now(),
            next_seq: self.next_seq,
            queue: self.q.clone(),
        });
        self.for_each_ep(|ep| ep.state_push());
    }

    /// 弹出最近的检查点，恢复时钟、事件队列与各节点状态。
    ///
    /// 栈空时属调用方契约违例，立即报错。
    #[tracing::instrument(skip(self))]
    pub fn state_pop(&mut self) -> Result<(), SimError> {
        let frame = self.state_stack.pop().ok_or(SimError::EmptyStateStack)?;
        info!(depth = self.state_stack.len(), "↩️  弹出检查点");
        self.clock.set_now(frame.now);
        self.next_seq = frame.next_seq;
        self.q = frame.queue;
        self.for_each_ep(|ep| ep.state_pop());
        Ok(())
    }

    fn for_each_ep(&mut self, mut f: impl FnMut(&mut dyn EventProcessor)) {
        for entry in self.nodes.values_mut() {
            if let Some(ep) = entry.ep.as_deref_mut() {
                f(ep);
            }
        }
    }
}
